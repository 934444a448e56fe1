//! Cross-origin access for browser clients.

use std::time::Duration;

use axum::extract::Request;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS,
    AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, ETAG, IF_MATCH, IF_NONE_MATCH, ORIGIN,
};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::middleware::Next;
use axum::response::Response;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::CorsConfig;

pub const ALLOWED_METHODS: [Method; 5] = [
    Method::GET,
    Method::HEAD,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
];

pub const ALLOWED_HEADERS: [HeaderName; 5] =
    [AUTHORIZATION, CONTENT_TYPE, ORIGIN, IF_MATCH, IF_NONE_MATCH];

pub const EXPOSED_HEADERS: [HeaderName; 3] = [ETAG, CONTENT_LENGTH, CONTENT_TYPE];

// Same lists as above, spelled the way clients compare them.
const ALLOWED_HEADERS_CANONICAL: &str = "Authorization, Content-Type, Origin, If-Match, If-None-Match";
const EXPOSED_HEADERS_CANONICAL: &str = "ETag, Content-Length, Content-Type";

/// Any origin is accepted and echoed back; access control is done by bearer
/// tokens, not by origin.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(ALLOWED_METHODS)
        .allow_headers(ALLOWED_HEADERS)
        .expose_headers(EXPOSED_HEADERS)
        .max_age(Duration::from_secs(config.max_age_secs))
}

/// Runs outside [`cors_layer`]. Preflight answers from [`CorsLayer`] carry no
/// `Access-Control-Expose-Headers` and list header names in lower case; some
/// clients match both case-sensitively against the canonical names.
pub async fn canonical_cors_headers(request: Request, next: Next) -> Response {
    let is_options = request.method() == Method::OPTIONS;
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    if !headers.contains_key(ACCESS_CONTROL_ALLOW_ORIGIN) {
        return response;
    }
    headers.insert(
        ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static(EXPOSED_HEADERS_CANONICAL),
    );
    if is_options && headers.contains_key(ACCESS_CONTROL_ALLOW_HEADERS) {
        headers.insert(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS_CANONICAL),
        );
    }
    response
}
