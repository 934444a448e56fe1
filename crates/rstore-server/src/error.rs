use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use rstore_index::IndexError;
use rstore_store::StoreError;
use rstore_types::{ETag, TypeError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("not modified")]
    NotModified { etag: Option<ETag> },

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("authentication required: {0}")]
    Unauthorized(String),

    #[error("access denied: {action}")]
    Forbidden { action: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("invalid request: {0}")]
    Type(#[from] TypeError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("storage fault: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    /// The HTTP status this outcome is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::NotModified { .. } => StatusCode::NOT_MODIFIED,
            Self::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BadRequest(_) | Self::Type(_) => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Index(IndexError::Conflict { .. }) => StatusCode::CONFLICT,
            Self::Index(_) => StatusCode::BAD_REQUEST,
            Self::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Store(StoreError::InvalidKey(_)) => StatusCode::BAD_REQUEST,
            Self::Store(StoreError::Timeout(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Store(_) | Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }

        match self {
            Self::NotModified { etag } => {
                let mut response = status.into_response();
                if let Some(value) = etag.and_then(|t| HeaderValue::from_str(&t.to_string()).ok()) {
                    response.headers_mut().insert(header::ETAG, value);
                }
                response
            }
            Self::Unauthorized(_) => {
                let mut response = (status, self.to_string()).into_response();
                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static("Bearer realm=\"rstore\""),
                );
                response
            }
            // Fault details stay in the log.
            _ if status.is_server_error() => (
                status,
                status.canonical_reason().unwrap_or("server error").to_string(),
            )
                .into_response(),
            _ => (status, self.to_string()).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn status_mapping() {
        assert_eq!(ServerError::NotFound("x".into()).status(), 404);
        assert_eq!(ServerError::NotModified { etag: None }.status(), 304);
        assert_eq!(ServerError::PreconditionFailed("x".into()).status(), 412);
        assert_eq!(ServerError::Unauthorized("x".into()).status(), 401);
        assert_eq!(ServerError::Forbidden { action: "x".into() }.status(), 403);
        assert_eq!(ServerError::Conflict("x".into()).status(), 409);
        assert_eq!(ServerError::MethodNotAllowed("x".into()).status(), 405);
        assert_eq!(
            ServerError::Store(StoreError::NotFound("k".into())).status(),
            404
        );
        assert_eq!(
            ServerError::Store(StoreError::Timeout(Duration::from_secs(1))).status(),
            503
        );
        assert_eq!(
            ServerError::Store(StoreError::Unavailable("x".into())).status(),
            500
        );
    }

    #[test]
    fn not_modified_carries_etag_and_no_body() {
        let etag = ETag::strong("abc").unwrap();
        let response = ServerError::NotModified { etag: Some(etag) }.into_response();
        assert_eq!(response.status(), 304);
        assert_eq!(response.headers()[header::ETAG], "\"abc\"");
    }

    #[test]
    fn unauthorized_challenges_for_bearer() {
        let response = ServerError::Unauthorized("no token".into()).into_response();
        assert_eq!(response.status(), 401);
        assert!(response.headers()[header::WWW_AUTHENTICATE]
            .to_str()
            .unwrap()
            .starts_with("Bearer"));
    }
}
