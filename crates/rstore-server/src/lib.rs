//! HTTP server for rstore.
//!
//! Serves per-user document namespaces under `/<user>/<path>` with
//! ETag-based conditional requests, JSON folder descriptions, bearer-token
//! scopes and CORS for browser clients.

pub mod auth;
pub mod conditional;
pub mod config;
pub mod cors;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod storage;

pub use auth::{Access, Action, AllowAllAuth, AuthProvider, Credentials, Identity, Scope, TokenAuth};
pub use conditional::{evaluate, Outcome, Preconditions, RequestKind, TagList};
pub use config::{AuthConfig, AuthMode, CorsConfig, ServerConfig, StorageConfig, TokenConfig};
pub use error::{ServerError, ServerResult};
pub use handler::AppState;
pub use server::RstoreServer;
pub use storage::{Document, PutOutcome, Storage};
