use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use rstore_store::{Backend, FsBackend, InMemoryBackend};

use crate::auth::{AllowAllAuth, AuthProvider, TokenAuth};
use crate::config::{AuthMode, ServerConfig, StorageConfig};
use crate::error::ServerResult;
use crate::handler::AppState;
use crate::router::build_router;
use crate::storage::Storage;

/// rstore HTTP server.
pub struct RstoreServer {
    config: ServerConfig,
    state: AppState,
}

impl RstoreServer {
    /// Open the configured backend, rebuild folder indexes and set up auth.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        config.validate()?;

        let backend: Arc<dyn Backend> = match &config.storage {
            StorageConfig::Memory => Arc::new(InMemoryBackend::new()),
            StorageConfig::Filesystem { root } => Arc::new(FsBackend::open(root)?),
        };
        let storage = Storage::open(backend, config.backend_timeout())?;

        let auth: Arc<dyn AuthProvider> = match config.auth.mode {
            AuthMode::AllowAll => {
                warn!("auth mode is allow-all; every request is authorized");
                Arc::new(AllowAllAuth)
            }
            AuthMode::Tokens => {
                let tokens = TokenAuth::from_config(&config.auth)?;
                info!(tokens = tokens.len(), "bearer token auth enabled");
                Arc::new(tokens)
            }
        };

        Ok(Self {
            config,
            state: AppState { storage, auth },
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn storage(&self) -> &Storage {
        &self.state.storage
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone(), &self.config)
    }

    /// Serve requests until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        info!(addr = %listener.local_addr()?, "rstore server listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("rstore server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "cannot listen for Ctrl-C; serving until killed");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, TokenConfig};

    #[test]
    fn server_construction() {
        let server = RstoreServer::new(ServerConfig::default()).unwrap();
        assert_eq!(server.config().bind_addr, "127.0.0.1:8042".parse().unwrap());
    }

    #[test]
    fn router_builds() {
        let server = RstoreServer::new(ServerConfig::default()).unwrap();
        let _router = server.router();
    }

    #[test]
    fn filesystem_backend_is_opened() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            storage: StorageConfig::Filesystem { root: dir.path().join("store") },
            ..ServerConfig::default()
        };
        let server = RstoreServer::new(config).unwrap();
        assert_eq!(
            server.storage().document_count(&rstore_types::UserName::parse("alice").unwrap()).unwrap(),
            0
        );
    }

    #[test]
    fn token_mode_rejects_bad_scopes() {
        let config = ServerConfig {
            auth: AuthConfig {
                mode: AuthMode::Tokens,
                tokens: vec![TokenConfig {
                    token: "t".into(),
                    user: "alice".into(),
                    scopes: vec!["nope".into()],
                }],
            },
            ..ServerConfig::default()
        };
        assert!(RstoreServer::new(config).is_err());
    }
}
