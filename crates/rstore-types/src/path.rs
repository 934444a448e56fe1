use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A validated path inside one user's namespace.
///
/// Paths are stored without a leading slash. The empty path is the root
/// folder, any other path ending in `/` is a folder, and everything else is a
/// document. Segments are never empty and never `.` or `..`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemPath(String);

impl ItemPath {
    /// The root folder of a namespace.
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Parse and validate a path. A single leading `/` is ignored.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let s = s.strip_prefix('/').unwrap_or(s);
        if s.is_empty() {
            return Ok(Self::root());
        }
        let body = s.strip_suffix('/').unwrap_or(s);
        let invalid = |reason| TypeError::InvalidPath {
            path: s.to_string(),
            reason,
        };
        for segment in body.split('/') {
            match segment {
                "" => return Err(invalid("empty segment")),
                "." | ".." => return Err(invalid("relative segment")),
                _ if segment.contains('\0') => return Err(invalid("NUL byte")),
                _ => {}
            }
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_folder(&self) -> bool {
        self.is_root() || self.0.ends_with('/')
    }

    pub fn is_document(&self) -> bool {
        !self.is_folder()
    }

    /// Non-empty path segments, without slashes.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Number of segments; zero for the root.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// The entry name inside the parent folder. Folder names keep their
    /// trailing slash (`"a/b/"` has name `"b/"`).
    pub fn name(&self) -> &str {
        if self.is_root() {
            return "";
        }
        let body = self.0.strip_suffix('/').unwrap_or(&self.0);
        let start = body.rfind('/').map(|i| i + 1).unwrap_or(0);
        &self.0[start..]
    }

    /// The folder containing this item. The root has no parent.
    pub fn parent(&self) -> Option<ItemPath> {
        if self.is_root() {
            return None;
        }
        let body = self.0.strip_suffix('/').unwrap_or(&self.0);
        Some(match body.rfind('/') {
            Some(i) => Self(body[..=i].to_string()),
            None => Self::root(),
        })
    }

    /// All enclosing folders, nearest first, ending with the root.
    pub fn ancestors(&self) -> Vec<ItemPath> {
        let mut out = Vec::new();
        let mut current = self.parent();
        while let Some(folder) = current {
            current = folder.parent();
            out.push(folder);
        }
        out
    }

    /// The folder path with the same name as this document (`a` -> `a/`).
    pub fn as_folder(&self) -> ItemPath {
        if self.is_folder() {
            self.clone()
        } else {
            Self(format!("{}/", self.0))
        }
    }

    /// The document path with the same name as this folder (`a/` -> `a`).
    /// The root has no document form.
    pub fn as_document(&self) -> Option<ItemPath> {
        if self.is_root() {
            None
        } else if self.is_folder() {
            Some(Self(self.0[..self.0.len() - 1].to_string()))
        } else {
            Some(self.clone())
        }
    }

    /// First segment, or `""` for the root.
    pub fn top_segment(&self) -> &str {
        self.segments().next().unwrap_or("")
    }

    /// Whether the item lives under the `public/` folder.
    pub fn is_public(&self) -> bool {
        self.top_segment() == "public" && self.0.len() > "public".len()
    }

    /// Access category: the first segment, or the second one below `public/`.
    pub fn category(&self) -> Option<&str> {
        let mut segments = self.segments();
        match segments.next()? {
            "public" => segments.next(),
            first => Some(first),
        }
    }
}

impl fmt::Display for ItemPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0)
    }
}

impl fmt::Debug for ItemPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemPath({:?})", self.0)
    }
}

impl TryFrom<String> for ItemPath {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<ItemPath> for String {
    fn from(path: ItemPath) -> Self {
        path.0
    }
}

/// Owner of a storage namespace, taken from the first URL segment.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserName(String);

impl UserName {
    const MAX_LEN: usize = 128;

    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let valid = !s.is_empty()
            && s.len() <= Self::MAX_LEN
            && !s.starts_with('.')
            && s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'));
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(TypeError::InvalidUser(s.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UserName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<UserName> for String {
    fn from(user: UserName) -> Self {
        user.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn p(s: &str) -> ItemPath {
        ItemPath::parse(s).unwrap()
    }

    #[test]
    fn root_and_folders() {
        assert!(p("").is_root());
        assert!(p("/").is_root());
        assert!(p("a/").is_folder());
        assert!(p("a/b").is_document());
        assert_eq!(p("/a/b").as_str(), "a/b");
    }

    #[test]
    fn rejects_bad_segments() {
        assert!(ItemPath::parse("a//b").is_err());
        assert!(ItemPath::parse("a/../b").is_err());
        assert!(ItemPath::parse("./a").is_err());
        assert!(ItemPath::parse("a//").is_err());
        assert!(ItemPath::parse("a\0b").is_err());
    }

    #[test]
    fn names() {
        assert_eq!(p("a/b/c.json").name(), "c.json");
        assert_eq!(p("a/b/").name(), "b/");
        assert_eq!(p("a").name(), "a");
        assert_eq!(p("").name(), "");
    }

    #[test]
    fn parents_and_ancestors() {
        assert_eq!(p("a/b/c.json").parent(), Some(p("a/b/")));
        assert_eq!(p("a/b/").parent(), Some(p("a/")));
        assert_eq!(p("a").parent(), Some(ItemPath::root()));
        assert_eq!(ItemPath::root().parent(), None);
        assert_eq!(
            p("a/b/c.json").ancestors(),
            vec![p("a/b/"), p("a/"), ItemPath::root()]
        );
        assert!(ItemPath::root().ancestors().is_empty());
    }

    #[test]
    fn folder_and_document_forms() {
        assert_eq!(p("a").as_folder(), p("a/"));
        assert_eq!(p("a/b/").as_document(), Some(p("a/b")));
        assert_eq!(ItemPath::root().as_document(), None);
    }

    #[test]
    fn categories() {
        assert_eq!(p("contacts/x.json").category(), Some("contacts"));
        assert_eq!(p("public/photos/a.jpg").category(), Some("photos"));
        assert_eq!(p("public/").category(), None);
        assert_eq!(ItemPath::root().category(), None);
        assert!(p("public/photos/a.jpg").is_public());
        assert!(p("public/").is_public());
        assert!(!p("public").is_public());
        assert!(!p("publicity/x").is_public());
    }

    #[test]
    fn user_names() {
        assert!(UserName::parse("remotestorage-test").is_ok());
        assert!(UserName::parse("alice@example.com").is_ok());
        assert!(UserName::parse("").is_err());
        assert!(UserName::parse(".meta").is_err());
        assert!(UserName::parse("a/b").is_err());
    }

    proptest! {
        #[test]
        fn valid_paths_roundtrip(segments in proptest::collection::vec("[a-z0-9_-]{1,8}", 1..6), folder in any::<bool>()) {
            let mut raw = segments.join("/");
            if folder {
                raw.push('/');
            }
            let path = ItemPath::parse(&raw).unwrap();
            prop_assert_eq!(path.as_str(), raw.as_str());
            prop_assert_eq!(path.depth(), segments.len());
            prop_assert_eq!(path.is_folder(), folder);
            prop_assert_eq!(path.ancestors().len(), segments.len());
        }
    }
}
