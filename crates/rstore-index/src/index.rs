//! The [`DirectoryIndex`] arena and its ETag propagation.

use std::collections::BTreeMap;

use rstore_etag::compute_directory_etag;
use rstore_types::{ETag, ItemPath, ObjectMeta};
use tracing::{debug, warn};

use crate::entry::{ChildEntry, DirectoryNode};
use crate::error::{IndexError, IndexResult};
use crate::listing::{FolderListing, ItemDescriptor};

/// Folder index for one user namespace.
///
/// Holds a `BTreeMap` from folder path to [`DirectoryNode`]. Only non-empty
/// folders have nodes. The index is purely in-memory; callers serialise
/// mutations (one `&mut` at a time) and rebuild it from the backend on start.
#[derive(Clone, Default)]
pub struct DirectoryIndex {
    nodes: BTreeMap<ItemPath, DirectoryNode>,
    documents: usize,
}

impl std::fmt::Debug for DirectoryIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryIndex")
            .field("folders", &self.nodes.len())
            .field("documents", &self.documents)
            .finish()
    }
}

impl DirectoryIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from every stored document.
    ///
    /// Documents that conflict with ones already indexed are skipped.
    pub fn rebuild<I>(documents: I) -> Self
    where
        I: IntoIterator<Item = (ItemPath, ObjectMeta)>,
    {
        let mut index = Self::new();
        for (path, meta) in documents {
            if let Err(e) = index.on_object_written(&path, meta) {
                warn!(%path, error = %e, "skipping document during index rebuild");
            }
        }
        debug!(
            documents = index.documents,
            folders = index.nodes.len(),
            "folder index rebuilt"
        );
        index
    }

    pub fn document_count(&self) -> usize {
        self.documents
    }

    pub fn folder_count(&self) -> usize {
        self.nodes.len()
    }

    /// The node for a folder, if it has any descendants.
    pub fn node(&self, folder: &ItemPath) -> Option<&DirectoryNode> {
        self.nodes.get(folder)
    }

    pub fn folder_exists(&self, folder: &ItemPath) -> bool {
        self.nodes.contains_key(folder)
    }

    /// Metadata of an indexed document.
    pub fn document(&self, path: &ItemPath) -> Option<&ObjectMeta> {
        let parent = path.parent()?;
        match self.nodes.get(&parent)?.get(path.name())? {
            ChildEntry::Document(meta) => Some(meta),
            ChildEntry::Folder { .. } => None,
        }
    }

    /// Current ETag of a folder. Absent folders have the empty-folder ETag.
    pub fn folder_etag(&self, folder: &ItemPath) -> IndexResult<ETag> {
        if !folder.is_folder() {
            return Err(IndexError::NotAFolder(folder.clone()));
        }
        Ok(match self.nodes.get(folder) {
            Some(node) => node.etag().clone(),
            None => compute_directory_etag(std::iter::empty()),
        })
    }

    /// Folder description of `folder`; empty (never an error) when absent.
    pub fn listing(&self, folder: &ItemPath) -> IndexResult<FolderListing> {
        let etag = self.folder_etag(folder)?;
        let items = self
            .nodes
            .get(folder)
            .map(|node| {
                node.children()
                    .iter()
                    .map(|(name, entry)| (name.clone(), ItemDescriptor::from(entry)))
                    .collect()
            })
            .unwrap_or_default();
        Ok(FolderListing::new(etag, items))
    }

    /// Fail if writing a document at `path` would overlap the tree: a folder
    /// of the same name exists, or an enclosing path is a document.
    pub fn check_conflict(&self, path: &ItemPath) -> IndexResult<()> {
        if !path.is_document() {
            return Err(IndexError::NotADocument(path.clone()));
        }
        let as_folder = path.as_folder();
        if self.nodes.contains_key(&as_folder) {
            return Err(IndexError::Conflict {
                path: path.clone(),
                existing: as_folder,
            });
        }
        for ancestor in path.ancestors() {
            if let Some(doc) = ancestor.as_document() {
                if self.document(&doc).is_some() {
                    return Err(IndexError::Conflict {
                        path: path.clone(),
                        existing: doc,
                    });
                }
            }
        }
        Ok(())
    }

    /// Record a created or replaced document and refresh every ancestor.
    pub fn on_object_written(&mut self, path: &ItemPath, meta: ObjectMeta) -> IndexResult<()> {
        self.check_conflict(path)?;
        let Some(parent) = path.parent() else {
            return Err(IndexError::NotADocument(path.clone()));
        };

        let node = self
            .nodes
            .entry(parent.clone())
            .or_insert_with(DirectoryNode::empty);
        if node.get(path.name()).is_none() {
            self.documents += 1;
        }
        node.insert(path.name().to_string(), ChildEntry::Document(meta));

        self.propagate(parent);
        debug!(%path, "index updated for write");
        Ok(())
    }

    /// Forget a document and refresh every ancestor. Folders left without
    /// descendants disappear. Returns the removed metadata, if any.
    pub fn on_object_deleted(&mut self, path: &ItemPath) -> IndexResult<Option<ObjectMeta>> {
        if !path.is_document() {
            return Err(IndexError::NotADocument(path.clone()));
        }
        let Some(parent) = path.parent() else {
            return Ok(None);
        };
        let removed = match self.nodes.get_mut(&parent) {
            Some(node) => match node.get(path.name()) {
                Some(ChildEntry::Document(_)) => match node.remove(path.name()) {
                    Some(ChildEntry::Document(meta)) => Some(meta),
                    _ => None,
                },
                _ => None,
            },
            None => None,
        };

        if removed.is_some() {
            self.documents -= 1;
            self.propagate(parent);
            debug!(%path, "index updated for delete");
        }
        Ok(removed)
    }

    /// Walk from `start` to the root, recomputing each folder ETag and the
    /// entry describing it in its parent. Empty folders are dropped.
    fn propagate(&mut self, start: ItemPath) {
        let mut folder = start;
        loop {
            let etag = match self.nodes.get_mut(&folder) {
                Some(node) if !node.is_empty() => Some(node.refresh_etag().clone()),
                _ => None,
            };
            if etag.is_none() {
                self.nodes.remove(&folder);
            }

            let Some(parent) = folder.parent() else {
                break;
            };
            let name = folder.name().to_string();
            match etag {
                Some(etag) => {
                    self.nodes
                        .entry(parent.clone())
                        .or_insert_with(DirectoryNode::empty)
                        .insert(name, ChildEntry::Folder { etag });
                }
                None => {
                    if let Some(parent_node) = self.nodes.get_mut(&parent) {
                        parent_node.remove(&name);
                    }
                }
            }
            folder = parent;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstore_etag::compute_object_etag;

    fn p(s: &str) -> ItemPath {
        ItemPath::parse(s).unwrap()
    }

    fn meta(content: &[u8], content_type: &str) -> ObjectMeta {
        ObjectMeta::new(compute_object_etag(content), content_type, content.len() as u64)
    }

    fn etag(index: &DirectoryIndex, folder: &str) -> ETag {
        index.folder_etag(&p(folder)).unwrap()
    }

    #[test]
    fn empty_index_lists_empty_root() {
        let index = DirectoryIndex::new();
        let listing = index.listing(&ItemPath::root()).unwrap();
        assert!(listing.is_empty());
        assert_eq!(listing.etag, compute_directory_etag(std::iter::empty()));
    }

    #[test]
    fn nonexistent_folder_lists_empty() {
        let mut index = DirectoryIndex::new();
        index.on_object_written(&p("a/b.json"), meta(b"{}", "application/json")).unwrap();
        let listing = index.listing(&p("does-not-exist/")).unwrap();
        assert!(listing.is_empty());
        assert_eq!(listing.etag, etag(&index, "deeply/nested/nothing/"));
    }

    #[test]
    fn nested_write_changes_every_ancestor() {
        let mut index = DirectoryIndex::new();
        index.on_object_written(&p("a/other.txt"), meta(b"x", "text/plain")).unwrap();
        let before = (etag(&index, "a/b/"), etag(&index, "a/"), etag(&index, ""));

        index.on_object_written(&p("a/b/c.json"), meta(b"{}", "application/json")).unwrap();
        let after = (etag(&index, "a/b/"), etag(&index, "a/"), etag(&index, ""));

        assert_ne!(before.0, after.0);
        assert_ne!(before.1, after.1);
        assert_ne!(before.2, after.2);
    }

    #[test]
    fn overwrite_with_new_content_changes_ancestors() {
        let mut index = DirectoryIndex::new();
        index.on_object_written(&p("a/b/c.json"), meta(b"1", "text/plain")).unwrap();
        let root_before = etag(&index, "");
        index.on_object_written(&p("a/b/c.json"), meta(b"2", "text/plain")).unwrap();
        assert_ne!(root_before, etag(&index, ""));
        assert_eq!(index.document_count(), 1);
    }

    #[test]
    fn sibling_folders_are_unaffected() {
        let mut index = DirectoryIndex::new();
        index.on_object_written(&p("x/one.txt"), meta(b"1", "text/plain")).unwrap();
        index.on_object_written(&p("y/two.txt"), meta(b"2", "text/plain")).unwrap();
        let x_before = etag(&index, "x/");
        index.on_object_written(&p("y/three.txt"), meta(b"3", "text/plain")).unwrap();
        assert_eq!(x_before, etag(&index, "x/"));
    }

    #[test]
    fn listing_describes_documents_and_folders() {
        let mut index = DirectoryIndex::new();
        index
            .on_object_written(&p("test.json"), meta(br#"{"foo": "bar"}"#, "application/json"))
            .unwrap();
        index
            .on_object_written(&p("some-subdir/nested.json"), meta(b"{}", "application/json"))
            .unwrap();

        let listing = index.listing(&ItemPath::root()).unwrap();
        assert_eq!(listing.items.len(), 2);
        match &listing.items["test.json"] {
            ItemDescriptor::Document {
                content_type,
                content_length,
                ..
            } => {
                assert_eq!(content_type, "application/json");
                assert_eq!(*content_length, 14);
            }
            other => panic!("expected document, got {other:?}"),
        }
        match &listing.items["some-subdir/"] {
            ItemDescriptor::Folder { etag } => {
                assert_eq!(etag, index.folder_etag(&p("some-subdir/")).unwrap().opaque());
            }
            other => panic!("expected folder, got {other:?}"),
        }
    }

    #[test]
    fn listing_json_shape() {
        let mut index = DirectoryIndex::new();
        index.on_object_written(&p("a/b.txt"), meta(b"hello", "text/plain")).unwrap();
        index.on_object_written(&p("c.txt"), meta(b"c", "text/plain")).unwrap();

        let json = serde_json::to_value(index.listing(&ItemPath::root()).unwrap()).unwrap();
        assert_eq!(json["@context"], "http://remotestorage.io/spec/folder-description");
        let folder = json["items"]["a/"].as_object().unwrap();
        assert_eq!(folder.keys().collect::<Vec<_>>(), vec!["ETag"]);
        let doc = &json["items"]["c.txt"];
        assert_eq!(doc["Content-Length"], 1);
        assert_eq!(doc["Content-Type"], "text/plain");
        assert!(doc["ETag"].is_string());
        assert!(json.get("etag").is_none());
    }

    #[test]
    fn delete_removes_empty_folders() {
        let mut index = DirectoryIndex::new();
        let empty_root = etag(&index, "");
        index.on_object_written(&p("a/b/c.json"), meta(b"{}", "application/json")).unwrap();
        assert!(index.folder_exists(&p("a/b/")));

        let removed = index.on_object_deleted(&p("a/b/c.json")).unwrap();
        assert!(removed.is_some());
        assert!(!index.folder_exists(&p("a/b/")));
        assert!(!index.folder_exists(&p("a/")));
        assert_eq!(index.folder_count(), 0);
        assert_eq!(index.document_count(), 0);
        assert_eq!(etag(&index, ""), empty_root);
    }

    #[test]
    fn delete_keeps_non_empty_parents() {
        let mut index = DirectoryIndex::new();
        index.on_object_written(&p("a/b/c.json"), meta(b"1", "text/plain")).unwrap();
        index.on_object_written(&p("a/d.json"), meta(b"2", "text/plain")).unwrap();
        let a_before = etag(&index, "a/");

        index.on_object_deleted(&p("a/b/c.json")).unwrap();
        assert!(index.folder_exists(&p("a/")));
        assert!(index.node(&p("a/")).unwrap().get("b/").is_none());
        assert_ne!(a_before, etag(&index, "a/"));
    }

    #[test]
    fn delete_missing_is_a_no_op() {
        let mut index = DirectoryIndex::new();
        index.on_object_written(&p("a/x"), meta(b"1", "text/plain")).unwrap();
        let root = etag(&index, "");
        assert_eq!(index.on_object_deleted(&p("a/y")).unwrap(), None);
        assert_eq!(index.on_object_deleted(&p("zzz/y")).unwrap(), None);
        assert_eq!(root, etag(&index, ""));
    }

    #[test]
    fn write_then_delete_restores_previous_etags() {
        let mut index = DirectoryIndex::new();
        index.on_object_written(&p("a/keep.txt"), meta(b"k", "text/plain")).unwrap();
        let before = (etag(&index, "a/"), etag(&index, ""));
        index.on_object_written(&p("a/tmp/t.txt"), meta(b"t", "text/plain")).unwrap();
        index.on_object_deleted(&p("a/tmp/t.txt")).unwrap();
        assert_eq!(before, (etag(&index, "a/"), etag(&index, "")));
    }

    #[test]
    fn conflicts_are_detected() {
        let mut index = DirectoryIndex::new();
        index.on_object_written(&p("a/b"), meta(b"1", "text/plain")).unwrap();

        let err = index.on_object_written(&p("a/b/c"), meta(b"2", "text/plain")).unwrap_err();
        assert_eq!(
            err,
            IndexError::Conflict {
                path: p("a/b/c"),
                existing: p("a/b"),
            }
        );

        let err = index.on_object_written(&p("a"), meta(b"3", "text/plain")).unwrap_err();
        assert!(matches!(err, IndexError::Conflict { .. }));
    }

    #[test]
    fn folder_paths_are_rejected() {
        let mut index = DirectoryIndex::new();
        assert!(matches!(
            index.on_object_written(&p("a/"), meta(b"1", "text/plain")),
            Err(IndexError::NotADocument(_))
        ));
        assert!(matches!(index.folder_etag(&p("a")), Err(IndexError::NotAFolder(_))));
    }

    #[test]
    fn document_lookup() {
        let mut index = DirectoryIndex::new();
        let m = meta(b"abc", "text/plain");
        index.on_object_written(&p("a/b.txt"), m.clone()).unwrap();
        assert_eq!(index.document(&p("a/b.txt")), Some(&m));
        assert_eq!(index.document(&p("a")), None);
        assert_eq!(index.document(&p("a/c.txt")), None);
    }

    #[test]
    fn rebuild_matches_incremental() {
        let docs = vec![
            (p("a/b/c.json"), meta(b"1", "application/json")),
            (p("a/d.txt"), meta(b"2", "text/plain")),
            (p("e.txt"), meta(b"3", "text/plain")),
        ];
        let mut incremental = DirectoryIndex::new();
        for (path, m) in docs.iter().rev() {
            incremental.on_object_written(path, m.clone()).unwrap();
        }
        let rebuilt = DirectoryIndex::rebuild(docs);
        assert_eq!(etag(&rebuilt, ""), etag(&incremental, ""));
        assert_eq!(rebuilt.document_count(), 3);
        assert_eq!(rebuilt.folder_count(), 3);
    }

    #[test]
    fn rebuild_skips_conflicting_documents() {
        let docs = vec![
            (p("a"), meta(b"1", "text/plain")),
            (p("a/b"), meta(b"2", "text/plain")),
        ];
        let index = DirectoryIndex::rebuild(docs);
        assert_eq!(index.document_count(), 1);
    }
}
