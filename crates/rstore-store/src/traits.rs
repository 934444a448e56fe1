use bytes::Bytes;

use crate::error::{StoreError, StoreResult};

/// A document as held by a backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredItem {
    pub content: Bytes,
    pub content_type: String,
}

impl StoredItem {
    pub fn new(content: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            content_type: content_type.into(),
        }
    }
}

/// A direct child of a key prefix.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ChildName {
    /// Entry name without any trailing slash.
    pub name: String,
    pub is_folder: bool,
}

/// Durable key/value storage for documents.
///
/// Keys are slash-delimited without a leading or trailing slash. Folders are
/// implicit: a key prefix is a folder exactly when some key lies below it.
/// Implementations must be thread-safe; callers serialise conflicting writes.
pub trait Backend: Send + Sync {
    /// Read a document.
    ///
    /// Returns `Err(StoreError::NotFound)` if the key does not exist.
    fn get(&self, key: &str) -> StoreResult<StoredItem>;

    /// Create or replace a document.
    fn put(&self, key: &str, content: Bytes, content_type: &str) -> StoreResult<()>;

    /// Remove a document.
    ///
    /// Returns `Err(StoreError::NotFound)` if the key does not exist.
    fn delete(&self, key: &str) -> StoreResult<()>;

    /// Direct children below `prefix`, which is empty or ends in `/`.
    fn list_children(&self, prefix: &str) -> StoreResult<Vec<ChildName>>;

    /// Every document key below `prefix`, sorted.
    fn list_all(&self, prefix: &str) -> StoreResult<Vec<String>>;

    /// Read a document, mapping `NotFound` to `None`.
    fn get_opt(&self, key: &str) -> StoreResult<Option<StoredItem>> {
        match self.get(key) {
            Ok(item) => Ok(Some(item)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Whether a document exists at `key`.
    fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get_opt(key)?.is_some())
    }
}

/// Reject keys that cannot name a document.
pub(crate) fn validate_key(key: &str) -> StoreResult<()> {
    let valid = !key.is_empty()
        && key
            .split('/')
            .all(|s| !s.is_empty() && s != "." && s != ".." && !s.contains('\0'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

/// Reject prefixes that are neither empty nor a folder key.
pub(crate) fn validate_prefix(prefix: &str) -> StoreResult<()> {
    if prefix.is_empty() {
        return Ok(());
    }
    match prefix.strip_suffix('/') {
        Some(body) => validate_key(body),
        None => Err(StoreError::InvalidKey(prefix.to_string())),
    }
}
