use std::collections::BTreeMap;

use rstore_etag::compute_directory_etag;
use rstore_types::{ETag, ObjectMeta};

/// One entry in a folder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChildEntry {
    Document(ObjectMeta),
    Folder { etag: ETag },
}

impl ChildEntry {
    pub fn etag(&self) -> &ETag {
        match self {
            Self::Document(meta) => &meta.etag,
            Self::Folder { etag } => etag,
        }
    }
}

/// A non-empty folder: its children keyed by name (folders end in `/`) and
/// the ETag derived from them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryNode {
    etag: ETag,
    children: BTreeMap<String, ChildEntry>,
}

impl DirectoryNode {
    pub(crate) fn empty() -> Self {
        Self {
            etag: compute_directory_etag(std::iter::empty()),
            children: BTreeMap::new(),
        }
    }

    pub fn etag(&self) -> &ETag {
        &self.etag
    }

    pub fn children(&self) -> &BTreeMap<String, ChildEntry> {
        &self.children
    }

    pub fn get(&self, name: &str) -> Option<&ChildEntry> {
        self.children.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub(crate) fn insert(&mut self, name: String, entry: ChildEntry) {
        self.children.insert(name, entry);
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<ChildEntry> {
        self.children.remove(name)
    }

    /// Recompute the folder ETag from the current children.
    pub(crate) fn refresh_etag(&mut self) -> &ETag {
        self.etag = compute_directory_etag(
            self.children
                .iter()
                .map(|(name, entry)| (name.as_str(), entry.etag())),
        );
        &self.etag
    }
}
