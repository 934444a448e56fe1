use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use bytes::Bytes;

use crate::error::{StoreError, StoreResult};
use crate::traits::{validate_key, validate_prefix, Backend, ChildName, StoredItem};

/// In-memory, `BTreeMap`-based backend.
///
/// Intended for tests and ephemeral servers. Data is lost when the backend is
/// dropped. The ordered map makes prefix listings a range scan.
pub struct InMemoryBackend {
    items: RwLock<BTreeMap<String, StoredItem>>,
}

impl InMemoryBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self {
            items: RwLock::new(BTreeMap::new()),
        }
    }

    fn read_map(
        &self,
    ) -> StoreResult<std::sync::RwLockReadGuard<'_, BTreeMap<String, StoredItem>>> {
        self.items
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn write_map(
        &self,
    ) -> StoreResult<std::sync::RwLockWriteGuard<'_, BTreeMap<String, StoredItem>>> {
        self.items
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }

    /// Number of documents currently stored.
    pub fn len(&self) -> usize {
        self.read_map().map(|m| m.len()).unwrap_or(0)
    }

    /// Returns `true` if no documents are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for InMemoryBackend {
    fn get(&self, key: &str) -> StoreResult<StoredItem> {
        validate_key(key)?;
        self.read_map()?
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn put(&self, key: &str, content: Bytes, content_type: &str) -> StoreResult<()> {
        validate_key(key)?;
        self.write_map()?
            .insert(key.to_string(), StoredItem::new(content, content_type));
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        validate_key(key)?;
        self.write_map()?
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn list_children(&self, prefix: &str) -> StoreResult<Vec<ChildName>> {
        validate_prefix(prefix)?;
        let map = self.read_map()?;
        let mut children = BTreeSet::new();
        for key in map.range(prefix.to_string()..).map(|(k, _)| k) {
            let Some(rest) = key.strip_prefix(prefix) else {
                break;
            };
            let child = match rest.split_once('/') {
                Some((folder, _)) => ChildName {
                    name: folder.to_string(),
                    is_folder: true,
                },
                None => ChildName {
                    name: rest.to_string(),
                    is_folder: false,
                },
            };
            children.insert(child);
        }
        Ok(children.into_iter().collect())
    }

    fn list_all(&self, prefix: &str) -> StoreResult<Vec<String>> {
        validate_prefix(prefix)?;
        let map = self.read_map()?;
        Ok(map
            .range(prefix.to_string()..)
            .map(|(k, _)| k)
            .take_while(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackend")
            .field("item_count", &self.len())
            .finish()
    }
}
