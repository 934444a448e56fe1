use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, ETAG};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::json;

use rstore_index::FolderListing;
use rstore_types::{ETag, ItemPath, UserName, DEFAULT_CONTENT_TYPE};

use crate::auth::{Action, AuthProvider, Credentials};
use crate::conditional::Preconditions;
use crate::error::{ServerError, ServerResult};
use crate::storage::{Document, Storage};

/// Shared state of every request handler.
#[derive(Clone)]
pub struct AppState {
    pub storage: Storage,
    pub auth: Arc<dyn AuthProvider>,
}

/// Path parameters of `/:user/` and `/:user/*path`.
///
/// Values arrive percent-decoded, so an encoded slash (`%2F`) separates
/// segments like a literal one.
#[derive(Debug, Deserialize)]
pub struct ItemParams {
    pub user: String,
    #[serde(default)]
    pub path: String,
}

impl ItemParams {
    fn parse(&self) -> ServerResult<(UserName, ItemPath)> {
        Ok((UserName::parse(&self.user)?, ItemPath::parse(&self.path)?))
    }
}

/// Health check handler.
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Plain `OPTIONS`; CORS headers are added by the CORS layer.
pub async fn options_handler() -> StatusCode {
    StatusCode::OK
}

/// `GET`/`HEAD` of a document or a folder description.
pub async fn get_item(
    State(state): State<AppState>,
    Path(params): Path<ItemParams>,
    headers: HeaderMap,
) -> ServerResult<Response> {
    let (user, path) = params.parse()?;
    authorize(&state, &headers, Action::Read { user: user.clone(), path: path.clone() }).await?;
    let pre = Preconditions::from_headers(&headers);

    if path.is_folder() {
        let listing = state.storage.listing(&user, &path, &pre)?;
        listing_response(&listing)
    } else {
        let document = state.storage.get_document(&user, &path, &pre).await?;
        document_response(document)
    }
}

pub async fn put_item(
    State(state): State<AppState>,
    Path(params): Path<ItemParams>,
    headers: HeaderMap,
    body: Bytes,
) -> ServerResult<Response> {
    let (user, path) = params.parse()?;
    if path.is_folder() {
        return Err(ServerError::MethodNotAllowed(format!("cannot PUT folder {path}")));
    }
    authorize(&state, &headers, Action::Write { user: user.clone(), path: path.clone() }).await?;

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string();
    let pre = Preconditions::from_headers(&headers);
    let outcome = state
        .storage
        .put_document(&user, &path, body, content_type, pre)
        .await?;

    let status = if outcome.created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, [(ETAG, etag_value(&outcome.etag)?)]).into_response())
}

pub async fn delete_item(
    State(state): State<AppState>,
    Path(params): Path<ItemParams>,
    headers: HeaderMap,
) -> ServerResult<Response> {
    let (user, path) = params.parse()?;
    if path.is_folder() {
        return Err(ServerError::MethodNotAllowed(format!("cannot DELETE folder {path}")));
    }
    authorize(&state, &headers, Action::Write { user: user.clone(), path: path.clone() }).await?;

    let pre = Preconditions::from_headers(&headers);
    let etag = state.storage.delete_document(&user, &path, pre).await?;
    Ok((StatusCode::OK, [(ETAG, etag_value(&etag)?)]).into_response())
}

/// Authenticate the caller and check `action`. Anonymous callers that are
/// refused get 401 so they can retry with a token; known callers get 403.
async fn authorize(state: &AppState, headers: &HeaderMap, action: Action) -> ServerResult<()> {
    let credentials = Credentials::from_headers(headers);
    let identity = state.auth.authenticate(&credentials).await?;
    if state.auth.authorize(&identity, &action).await? {
        return Ok(());
    }
    if identity.is_anonymous() {
        Err(ServerError::Unauthorized(format!("{action} requires a bearer token")))
    } else {
        Err(ServerError::Forbidden { action: action.to_string() })
    }
}

fn etag_value(etag: &ETag) -> ServerResult<HeaderValue> {
    HeaderValue::from_str(&etag.to_string())
        .map_err(|_| ServerError::Internal(format!("unrepresentable ETag {etag}")))
}

fn document_response(document: Document) -> ServerResult<Response> {
    let content_type = HeaderValue::from_str(&document.meta.content_type).map_err(|_| {
        ServerError::Internal(format!("stored content type {:?}", document.meta.content_type))
    })?;

    let mut headers = HeaderMap::new();
    headers.insert(ETAG, etag_value(&document.meta.etag)?);
    headers.insert(CONTENT_TYPE, content_type);
    headers.insert(CONTENT_LENGTH, HeaderValue::from(document.meta.content_length));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    Ok((headers, Body::from(document.content)).into_response())
}

fn listing_response(listing: &FolderListing) -> ServerResult<Response> {
    let body = serde_json::to_vec(listing)
        .map_err(|e| ServerError::Internal(format!("folder description: {e}")))?;

    let mut headers = HeaderMap::new();
    headers.insert(ETAG, etag_value(&listing.etag)?);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    Ok((headers, body).into_response())
}
