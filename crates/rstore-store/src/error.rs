use std::time::Duration;

/// Errors from backend operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested key does not exist.
    #[error("key not found: {0}")]
    NotFound(String),

    /// The key cannot be mapped onto this backend.
    #[error("invalid key {0:?}")]
    InvalidKey(String),

    /// I/O error from the underlying storage medium.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored metadata could not be decoded.
    #[error("corrupt entry {key}: {reason}")]
    Corrupt { key: String, reason: String },

    /// The backend did not answer within the configured bound.
    #[error("backend timed out after {0:?}")]
    Timeout(Duration),

    /// Internal state is unusable (poisoned lock, cancelled worker).
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Anything other than `NotFound` is a storage fault.
    pub fn is_fault(&self) -> bool {
        !self.is_not_found()
    }
}

/// Result alias for backend operations.
pub type StoreResult<T> = Result<T, StoreError>;
