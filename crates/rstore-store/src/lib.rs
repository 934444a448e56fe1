//! Document storage backends for rstore.
//!
//! A backend is a durable mapping from flat keys (`"user/dir/doc.json"`) to a
//! byte payload plus its content type. Backends know nothing about ETags or
//! folder listings; those are derived by the layers above.
//!
//! # Backends
//!
//! All backends implement the [`Backend`] trait:
//!
//! - [`InMemoryBackend`] -- `BTreeMap`-based store for tests and ephemeral servers
//! - [`FsBackend`] -- one file per document plus a JSON metadata sidecar
//!
//! # Design Rules
//!
//! 1. `NotFound` is an ordinary outcome; every other error is a storage fault.
//! 2. Writes replace the whole document atomically.
//! 3. All I/O errors are propagated, never silently ignored.

#[cfg(test)]
mod conformance;
pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsBackend;
pub use memory::InMemoryBackend;
pub use traits::{Backend, ChildName, StoredItem};

pub use rstore_types::DEFAULT_CONTENT_TYPE;
