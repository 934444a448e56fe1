use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;

use rstore_types::{ItemPath, UserName};

use crate::config::AuthConfig;
use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    /// The storage namespace this identity may act on, if any.
    pub user: Option<UserName>,
    pub scopes: Vec<Scope>,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self { name: "anonymous".into(), user: None, scopes: Vec::new() }
    }

    pub fn user(user: UserName, scopes: Vec<Scope>) -> Self {
        Self { name: user.to_string(), user: Some(user), scopes }
    }

    pub fn is_anonymous(&self) -> bool {
        self.user.is_none()
    }

    /// Whether some scope grants `access` on `category` (`None` is the root).
    pub fn grants(&self, category: Option<&str>, access: Access) -> bool {
        self.scopes.iter().any(|s| s.covers(category, access))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credentials {
    Bearer(String),
    Anonymous,
}

impl Credentials {
    /// Anything other than a well-formed `Bearer` header counts as anonymous.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| {
                let (scheme, token) = v.split_once(' ')?;
                scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
            })
            .filter(|token| !token.is_empty())
            .map(|token| Self::Bearer(token.to_string()))
            .unwrap_or(Self::Anonymous)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Access {
    Read,
    ReadWrite,
}

/// `<category>:<r|rw>`, where category `*` covers every path including the root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scope {
    pub category: String,
    pub access: Access,
}

impl Scope {
    pub fn parse(s: &str) -> ServerResult<Self> {
        let invalid = || ServerError::Config(format!("invalid scope {s:?}"));
        let (category, access) = s.rsplit_once(':').ok_or_else(invalid)?;
        let access = match access {
            "r" => Access::Read,
            "rw" => Access::ReadWrite,
            _ => return Err(invalid()),
        };
        if category.is_empty() || category.contains('/') {
            return Err(invalid());
        }
        Ok(Self { category: category.to_string(), access })
    }

    pub fn covers(&self, category: Option<&str>, access: Access) -> bool {
        let category_ok = match category {
            _ if self.category == "*" => true,
            Some(c) => c == self.category,
            None => false,
        };
        category_ok && self.access >= access
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let access = match self.access {
            Access::Read => "r",
            Access::ReadWrite => "rw",
        };
        write!(f, "{}:{access}", self.category)
    }
}

#[derive(Clone, Debug)]
pub enum Action {
    Read { user: UserName, path: ItemPath },
    Write { user: UserName, path: ItemPath },
}

impl Action {
    pub fn user(&self) -> &UserName {
        match self {
            Self::Read { user, .. } | Self::Write { user, .. } => user,
        }
    }

    pub fn path(&self) -> &ItemPath {
        match self {
            Self::Read { path, .. } | Self::Write { path, .. } => path,
        }
    }

    fn access(&self) -> Access {
        match self {
            Self::Read { .. } => Access::Read,
            Self::Write { .. } => Access::ReadWrite,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { user, path } => write!(f, "read:{user}{path}"),
            Self::Write { user, path } => write!(f, "write:{user}{path}"),
        }
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity>;
    async fn authorize(&self, identity: &Identity, action: &Action) -> ServerResult<bool>;
}

pub struct AllowAllAuth;

#[async_trait]
impl AuthProvider for AllowAllAuth {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity> {
        match credentials {
            Credentials::Bearer(token) => Ok(Identity {
                name: format!("bearer:{}", &token[..8.min(token.len())]),
                user: None,
                scopes: Vec::new(),
            }),
            Credentials::Anonymous => Ok(Identity::anonymous()),
        }
    }

    async fn authorize(&self, _identity: &Identity, _action: &Action) -> ServerResult<bool> {
        Ok(true)
    }
}

/// Static bearer tokens, each bound to one user namespace.
///
/// Documents below `public/` are readable without credentials; public
/// folder listings are not.
pub struct TokenAuth {
    tokens: HashMap<String, Identity>,
}

impl TokenAuth {
    pub fn from_config(config: &AuthConfig) -> ServerResult<Self> {
        let mut tokens = HashMap::with_capacity(config.tokens.len());
        for entry in &config.tokens {
            let user = UserName::parse(&entry.user)?;
            let scopes = entry
                .scopes
                .iter()
                .map(|s| Scope::parse(s))
                .collect::<ServerResult<Vec<_>>>()?;
            tokens.insert(entry.token.clone(), Identity::user(user, scopes));
        }
        Ok(Self { tokens })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl AuthProvider for TokenAuth {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity> {
        match credentials {
            Credentials::Bearer(token) => self
                .tokens
                .get(token)
                .cloned()
                .ok_or_else(|| ServerError::Unauthorized("unknown bearer token".into())),
            Credentials::Anonymous => Ok(Identity::anonymous()),
        }
    }

    async fn authorize(&self, identity: &Identity, action: &Action) -> ServerResult<bool> {
        let path = action.path();
        if matches!(action, Action::Read { .. }) && path.is_public() && path.is_document() {
            return Ok(true);
        }
        if identity.user.as_ref() != Some(action.user()) {
            return Ok(false);
        }
        Ok(identity.grants(path.category(), action.access()))
    }
}
