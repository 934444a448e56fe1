use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::{middleware, Router};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::cors::{cors_layer, canonical_cors_headers};
use crate::handler::{self, AppState};

/// Build the axum router with all rstore endpoints.
///
/// `HEAD` is served by the `GET` handlers with the body stripped.
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/.well-known/rstore/health", get(handler::health_handler))
        .route(
            "/:user/",
            get(handler::get_item).options(handler::options_handler),
        )
        .route(
            "/:user/*path",
            get(handler::get_item)
                .put(handler::put_item)
                .delete(handler::delete_item)
                .options(handler::options_handler),
        )
        .layer(DefaultBodyLimit::max(config.max_object_size))
        .layer(cors_layer(&config.cors))
        .layer(middleware::from_fn(canonical_cors_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
