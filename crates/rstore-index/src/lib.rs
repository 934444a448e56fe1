//! Folder index for rstore.
//!
//! Folders are never stored; they are a view derived from document paths.
//! The [`DirectoryIndex`] keeps one [`DirectoryNode`] per non-empty folder in
//! an arena keyed by path. Parent links are resolved by splitting paths, so
//! nodes never reference each other directly.
//!
//! # Invariants
//!
//! 1. A folder's ETag is the fingerprint of its sorted `(name, child ETag)`
//!    pairs, so it changes whenever any descendant document changes.
//! 2. Every mutation recomputes the whole ancestor chain, leaf to root.
//! 3. A folder exists exactly while it has at least one descendant document.
//! 4. Absent folders list as empty, with the ETag of an empty folder.

pub mod entry;
pub mod error;
pub mod index;
pub mod listing;

pub use entry::{ChildEntry, DirectoryNode};
pub use error::{IndexError, IndexResult};
pub use index::DirectoryIndex;
pub use listing::{FolderListing, ItemDescriptor, FOLDER_DESCRIPTION_CONTEXT};
