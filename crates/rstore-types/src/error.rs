use thiserror::Error;

/// Errors produced by type parsing and validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("invalid user name {0:?}")]
    InvalidUser(String),

    #[error("invalid entity tag {0:?}")]
    InvalidETag(String),
}
