use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use rstore_types::ETag;

use crate::entry::ChildEntry;

/// JSON-LD context of a folder description.
pub const FOLDER_DESCRIPTION_CONTEXT: &str = "http://remotestorage.io/spec/folder-description";

/// Per-item descriptor inside a folder description.
///
/// Folders carry only their ETag; documents add length and type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemDescriptor {
    Document {
        #[serde(rename = "ETag")]
        etag: String,
        #[serde(rename = "Content-Type")]
        content_type: String,
        #[serde(rename = "Content-Length")]
        content_length: u64,
    },
    Folder {
        #[serde(rename = "ETag")]
        etag: String,
    },
}

impl From<&ChildEntry> for ItemDescriptor {
    fn from(entry: &ChildEntry) -> Self {
        match entry {
            ChildEntry::Document(meta) => Self::Document {
                etag: meta.etag.opaque().to_string(),
                content_type: meta.content_type.clone(),
                content_length: meta.content_length,
            },
            ChildEntry::Folder { etag } => Self::Folder {
                etag: etag.opaque().to_string(),
            },
        }
    }
}

/// A folder description as served for `GET /user/folder/`.
///
/// The folder ETag travels alongside for the response header but is not
/// part of the JSON body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FolderListing {
    #[serde(rename = "@context")]
    pub context: String,
    pub items: BTreeMap<String, ItemDescriptor>,
    #[serde(skip)]
    pub etag: ETag,
}

impl FolderListing {
    pub(crate) fn new(etag: ETag, items: BTreeMap<String, ItemDescriptor>) -> Self {
        Self {
            context: FOLDER_DESCRIPTION_CONTEXT.to_string(),
            items,
            etag,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
