//! ETag engine for rstore.
//!
//! Documents are fingerprinted from their bytes; folders from the sorted
//! `(name, child ETag)` pairs of their direct children. Both use
//! domain-separated BLAKE3, so a document and a folder never share an ETag by
//! accident, and both are pure functions with no hidden state.

pub mod hasher;

pub use hasher::{compute_directory_etag, compute_object_etag, ETagHasher};
