use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// An HTTP entity tag.
///
/// Rendered as a double-quoted opaque token, optionally prefixed with `W/`
/// for weak validators. The opaque part never contains a double quote.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ETag {
    opaque: String,
    weak: bool,
}

impl ETag {
    /// A strong validator with the given opaque tag.
    pub fn strong(opaque: impl Into<String>) -> Result<Self, TypeError> {
        Self::build(opaque.into(), false)
    }

    /// A weak validator with the given opaque tag.
    pub fn weak(opaque: impl Into<String>) -> Result<Self, TypeError> {
        Self::build(opaque.into(), true)
    }

    /// A strong validator whose opaque tag is the lowercase hex rendering of
    /// `digest`.
    pub fn from_digest(digest: &[u8]) -> Self {
        Self {
            opaque: hex::encode(digest),
            weak: false,
        }
    }

    fn build(opaque: String, weak: bool) -> Result<Self, TypeError> {
        if opaque.contains('"') || opaque.chars().any(char::is_control) {
            return Err(TypeError::InvalidETag(opaque));
        }
        Ok(Self { opaque, weak })
    }

    /// Parse the header form: `"tag"` or `W/"tag"`.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let s = s.trim();
        let (weak, rest) = match s.strip_prefix("W/") {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let opaque = rest
            .strip_prefix('"')
            .and_then(|r| r.strip_suffix('"'))
            .ok_or_else(|| TypeError::InvalidETag(s.to_string()))?;
        Self::build(opaque.to_string(), weak)
    }

    /// Parse a client-supplied tag, accepting bare unquoted tokens as strong
    /// tags. Clients frequently send those in `If-Match`.
    pub fn parse_lenient(s: &str) -> Result<Self, TypeError> {
        let s = s.trim();
        if s.starts_with('"') || s.starts_with("W/\"") {
            Self::parse(s)
        } else if s.is_empty() {
            Err(TypeError::InvalidETag(String::new()))
        } else {
            Self::build(s.to_string(), false)
        }
    }

    /// The opaque tag without quotes or weak prefix.
    pub fn opaque(&self) -> &str {
        &self.opaque
    }

    pub fn is_weak(&self) -> bool {
        self.weak
    }

    /// Strong comparison: both tags strong and opaque parts equal.
    pub fn strong_eq(&self, other: &ETag) -> bool {
        !self.weak && !other.weak && self.opaque == other.opaque
    }

    /// Weak comparison: opaque parts equal, weakness ignored.
    pub fn weak_eq(&self, other: &ETag) -> bool {
        self.opaque == other.opaque
    }
}

impl fmt::Display for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.weak {
            write!(f, "W/\"{}\"", self.opaque)
        } else {
            write!(f, "\"{}\"", self.opaque)
        }
    }
}

impl fmt::Debug for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ETag({self})")
    }
}

impl FromStr for ETag {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ETag {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<ETag> for String {
    fn from(tag: ETag) -> Self {
        tag.to_string()
    }
}
