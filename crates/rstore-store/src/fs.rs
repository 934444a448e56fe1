use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{StoreError, StoreResult};
use crate::traits::{validate_key, validate_prefix, Backend, ChildName, StoredItem};

/// Metadata sidecar stored next to each document.
#[derive(Debug, Serialize, Deserialize)]
struct MetaRecord {
    key: String,
    content_type: String,
}

/// Filesystem backend.
///
/// On-disk layout below `root`:
///
/// ```text
/// data/<key>              document bytes, folders map to directories
/// meta/<blake3(key)>.json content type sidecar
/// tmp/                    staging area for atomic renames
/// ```
///
/// Sidecars are keyed by hash so they can never collide with document or
/// folder names. Directories left empty by a delete are pruned.
#[derive(Debug)]
pub struct FsBackend {
    root: PathBuf,
    data: PathBuf,
    meta: PathBuf,
    tmp: PathBuf,
}

impl FsBackend {
    /// Open (creating if needed) a backend rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        let backend = Self {
            data: root.join("data"),
            meta: root.join("meta"),
            tmp: root.join("tmp"),
            root,
        };
        fs::create_dir_all(&backend.data)?;
        fs::create_dir_all(&backend.meta)?;
        fs::create_dir_all(&backend.tmp)?;
        debug!(root = %backend.root.display(), "filesystem backend opened");
        Ok(backend)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn data_path(&self, key: &str) -> PathBuf {
        self.data.join(key)
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.meta
            .join(format!("{}.json", blake3::hash(key.as_bytes()).to_hex()))
    }

    /// Write `bytes` to `target` via a synced temp file and a rename.
    fn write_atomic(&self, target: &Path, bytes: &[u8]) -> StoreResult<()> {
        let mut staged = NamedTempFile::new_in(&self.tmp)?;
        staged.write_all(bytes)?;
        staged.as_file().sync_all()?;
        staged.persist(target).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    fn read_content_type(&self, key: &str) -> StoreResult<String> {
        let raw = match fs::read(self.meta_path(key)) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(key, "metadata sidecar missing; using default content type");
                return Ok(crate::DEFAULT_CONTENT_TYPE.to_string());
            }
            Err(e) => return Err(e.into()),
        };
        let record: MetaRecord =
            serde_json::from_slice(&raw).map_err(|e| StoreError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        Ok(record.content_type)
    }

    /// Remove empty directories from `start` upwards, stopping at `data/`.
    fn prune_empty_dirs(&self, start: Option<&Path>) {
        let mut current = start;
        while let Some(dir) = current {
            if dir == self.data || !dir.starts_with(&self.data) {
                break;
            }
            // Fails on non-empty directories, which ends the walk.
            if fs::remove_dir(dir).is_err() {
                break;
            }
            current = dir.parent();
        }
    }

    fn contains_documents(path: &Path) -> bool {
        WalkDir::new(path)
            .into_iter()
            .filter_map(Result::ok)
            .any(|e| e.file_type().is_file())
    }
}

impl Backend for FsBackend {
    fn get(&self, key: &str) -> StoreResult<StoredItem> {
        validate_key(key)?;
        let path = self.data_path(key);
        if !path.is_file() {
            return Err(StoreError::NotFound(key.to_string()));
        }
        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(key.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let content_type = self.read_content_type(key)?;
        Ok(StoredItem::new(content, content_type))
    }

    fn put(&self, key: &str, content: Bytes, content_type: &str) -> StoreResult<()> {
        validate_key(key)?;
        let path = self.data_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        self.write_atomic(&path, &content)?;

        let record = MetaRecord {
            key: key.to_string(),
            content_type: content_type.to_string(),
        };
        let raw = serde_json::to_vec(&record).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.write_atomic(&self.meta_path(key), &raw)?;
        debug!(key, bytes = content.len(), "document written");
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        validate_key(key)?;
        let path = self.data_path(key);
        if !path.is_file() {
            return Err(StoreError::NotFound(key.to_string()));
        }
        fs::remove_file(&path)?;
        match fs::remove_file(self.meta_path(key)) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.prune_empty_dirs(path.parent());
        debug!(key, "document deleted");
        Ok(())
    }

    fn list_children(&self, prefix: &str) -> StoreResult<Vec<ChildName>> {
        validate_prefix(prefix)?;
        let dir = self.data_path(prefix);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            // A document where a folder was asked for has no children.
            Err(_) if dir.is_file() => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut children = Vec::new();
        for entry in entries {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                warn!(path = %entry.path().display(), "skipping non UTF-8 entry");
                continue;
            };
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                if Self::contains_documents(&entry.path()) {
                    children.push(ChildName { name, is_folder: true });
                }
            } else if file_type.is_file() {
                children.push(ChildName { name, is_folder: false });
            }
        }
        children.sort();
        Ok(children)
    }

    fn list_all(&self, prefix: &str) -> StoreResult<Vec<String>> {
        validate_prefix(prefix)?;
        let start = self.data_path(prefix);
        if !start.is_dir() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for entry in WalkDir::new(&start) {
            let entry = entry.map_err(|e| StoreError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.data) else {
                continue;
            };
            let segments: Option<Vec<&str>> =
                relative.components().map(|c| c.as_os_str().to_str()).collect();
            match segments {
                Some(segments) => keys.push(segments.join("/")),
                None => warn!(path = %entry.path().display(), "skipping non UTF-8 path"),
            }
        }
        keys.sort();
        Ok(keys)
    }
}
