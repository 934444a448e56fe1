use rstore_types::ItemPath;

/// Errors from folder index operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IndexError {
    /// A folder path was given where a document is required.
    #[error("not a document path: {0}")]
    NotADocument(ItemPath),

    /// A document path was given where a folder is required.
    #[error("not a folder path: {0}")]
    NotAFolder(ItemPath),

    /// The document would shadow a folder of the same name, or sit below an
    /// existing document.
    #[error("{path} conflicts with existing {existing}")]
    Conflict { path: ItemPath, existing: ItemPath },
}

/// Result alias for index operations.
pub type IndexResult<T> = Result<T, IndexError>;
