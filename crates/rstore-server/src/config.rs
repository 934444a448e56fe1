use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::Scope;
use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Largest accepted request body, in bytes.
    pub max_object_size: usize,
    /// Upper bound on any single backend call.
    pub backend_timeout_ms: u64,
    pub storage: StorageConfig,
    pub cors: CorsConfig,
    pub auth: AuthConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8042)),
            max_object_size: 64 * 1024 * 1024,
            backend_timeout_ms: 10_000,
            storage: StorageConfig::default(),
            cors: CorsConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(s: &str) -> ServerResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| ServerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    pub fn to_toml_string(&self) -> ServerResult<String> {
        toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_millis(self.backend_timeout_ms)
    }

    /// Reject settings that would only fail at request time.
    pub fn validate(&self) -> ServerResult<()> {
        if self.max_object_size == 0 {
            return Err(ServerError::Config("max_object_size must be positive".into()));
        }
        if self.backend_timeout_ms == 0 {
            return Err(ServerError::Config("backend_timeout_ms must be positive".into()));
        }
        for token in &self.auth.tokens {
            if token.token.is_empty() {
                return Err(ServerError::Config(format!("empty token for user {}", token.user)));
            }
            rstore_types::UserName::parse(&token.user)?;
            for scope in &token.scopes {
                Scope::parse(scope)?;
            }
        }
        Ok(())
    }
}

/// Where documents are kept.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    #[default]
    Memory,
    Filesystem { root: PathBuf },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// How long browsers may cache a preflight answer.
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self { max_age_secs: 3600 }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub mode: AuthMode,
    pub tokens: Vec<TokenConfig>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMode {
    /// Any request is allowed. Development only.
    #[default]
    AllowAll,
    /// Static bearer tokens from [`AuthConfig::tokens`].
    Tokens,
}

/// A bearer token bound to one user and a set of `<category>:<r|rw>` scopes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub token: String,
    pub user: String,
    pub scopes: Vec<String>,
}
