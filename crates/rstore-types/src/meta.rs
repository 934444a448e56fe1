use serde::{Deserialize, Serialize};

use crate::etag::ETag;

/// Content type assumed when a document is written without one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Descriptor of a stored document as it appears in folder listings and
/// response headers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub etag: ETag,
    pub content_type: String,
    pub content_length: u64,
}

impl ObjectMeta {
    pub fn new(etag: ETag, content_type: impl Into<String>, content_length: u64) -> Self {
        Self {
            etag,
            content_type: content_type.into(),
            content_length,
        }
    }
}
