//! Foundation types for rstore, a per-user remote storage server.
//!
//! Every other rstore crate depends on `rstore-types`.
//!
//! # Key Types
//!
//! - [`ItemPath`] — Validated document or folder path inside a user namespace
//! - [`ETag`] — Entity tag used as a cache validator and concurrency token
//! - [`ObjectMeta`] — Content type, length and ETag of a stored document
//! - [`UserName`] — Validated namespace owner

pub mod error;
pub mod etag;
pub mod meta;
pub mod path;

pub use error::TypeError;
pub use etag::ETag;
pub use meta::{ObjectMeta, DEFAULT_CONTENT_TYPE};
pub use path::{ItemPath, UserName};
