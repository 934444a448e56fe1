//! Conditional request evaluation (`If-Match` / `If-None-Match`).
//!
//! [`evaluate`] is a pure decision over the request preconditions, the
//! current ETag (or absence) of the target and the kind of request. It knows
//! nothing about HTTP framing; handlers translate the [`Outcome`].

use axum::http::header::{IF_MATCH, IF_NONE_MATCH};
use axum::http::{HeaderMap, HeaderName};

use rstore_types::ETag;

/// A parsed `If-Match` or `If-None-Match` value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TagList {
    /// `*`
    Any,
    /// Comma-separated entity tags. Unparseable members are dropped.
    Tags(Vec<ETag>),
}

impl TagList {
    pub fn parse(value: &str) -> Self {
        if value.trim() == "*" {
            return Self::Any;
        }
        Self::Tags(
            split_list(value)
                .filter_map(|item| ETag::parse_lenient(item).ok())
                .collect(),
        )
    }

    /// Strong comparison, as `If-Match` requires.
    pub fn matches_strong(&self, current: &ETag) -> bool {
        match self {
            Self::Any => true,
            Self::Tags(tags) => tags.iter().any(|t| t.strong_eq(current)),
        }
    }

    /// Weak comparison, as `If-None-Match` requires.
    pub fn matches_weak(&self, current: &ETag) -> bool {
        match self {
            Self::Any => true,
            Self::Tags(tags) => tags.iter().any(|t| t.weak_eq(current)),
        }
    }
}

/// Split a header list on commas that are not inside a quoted tag.
fn split_list(value: &str) -> impl Iterator<Item = &str> {
    let mut items = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    for (i, c) in value.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ',' if !quoted => {
                items.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(&value[start..]);
    items.into_iter().map(str::trim).filter(|s| !s.is_empty())
}

/// Request-scoped preconditions. Never persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Preconditions {
    pub if_match: Option<TagList>,
    pub if_none_match: Option<TagList>,
}

impl Preconditions {
    /// Read both headers; repeated header lines are combined as one list.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            if_match: header_list(headers, &IF_MATCH),
            if_none_match: header_list(headers, &IF_NONE_MATCH),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.if_match.is_none() && self.if_none_match.is_none()
    }
}

fn header_list(headers: &HeaderMap, name: &HeaderName) -> Option<TagList> {
    let values: Vec<&str> = headers
        .get_all(name)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(TagList::parse(&values.join(",")))
    }
}

/// Whether the request only reads (GET/HEAD) or mutates (PUT/DELETE).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestKind {
    Read,
    Write,
}

/// Result of evaluating preconditions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Proceed,
    /// 304: only produced for reads.
    NotModified,
    /// 412
    PreconditionFailed,
}

/// Decide whether a request may proceed.
///
/// `If-Match` is evaluated first and short-circuits: an absent target never
/// satisfies it. `If-None-Match: *` fails whenever the target exists. A tag
/// list in `If-None-Match` that contains the current tag yields `NotModified`
/// for reads and `PreconditionFailed` for writes.
pub fn evaluate(pre: &Preconditions, current: Option<&ETag>, kind: RequestKind) -> Outcome {
    if let Some(list) = &pre.if_match {
        match current {
            Some(tag) if list.matches_strong(tag) => {}
            _ => return Outcome::PreconditionFailed,
        }
    }

    if let (Some(list), Some(tag)) = (&pre.if_none_match, current) {
        match list {
            TagList::Any => return Outcome::PreconditionFailed,
            TagList::Tags(_) if list.matches_weak(tag) => {
                return match kind {
                    RequestKind::Read => Outcome::NotModified,
                    RequestKind::Write => Outcome::PreconditionFailed,
                };
            }
            TagList::Tags(_) => {}
        }
    }

    Outcome::Proceed
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn tag(s: &str) -> ETag {
        ETag::strong(s).unwrap()
    }

    fn pre(if_match: Option<&str>, if_none_match: Option<&str>) -> Preconditions {
        Preconditions {
            if_match: if_match.map(TagList::parse),
            if_none_match: if_none_match.map(TagList::parse),
        }
    }

    #[test]
    fn no_headers_always_proceed() {
        let p = Preconditions::default();
        assert!(p.is_empty());
        assert_eq!(evaluate(&p, None, RequestKind::Write), Outcome::Proceed);
        assert_eq!(evaluate(&p, Some(&tag("a")), RequestKind::Read), Outcome::Proceed);
    }

    #[test]
    fn if_match_requires_current_tag() {
        let current = tag("abc");
        let ok = pre(Some("\"abc\""), None);
        assert_eq!(evaluate(&ok, Some(&current), RequestKind::Write), Outcome::Proceed);

        let wrong = pre(Some("invalid"), None);
        assert_eq!(
            evaluate(&wrong, Some(&current), RequestKind::Write),
            Outcome::PreconditionFailed
        );
    }

    #[test]
    fn if_match_never_satisfied_by_absence() {
        let p = pre(Some("doesnotmatter"), None);
        assert_eq!(evaluate(&p, None, RequestKind::Write), Outcome::PreconditionFailed);
        let any = pre(Some("*"), None);
        assert_eq!(evaluate(&any, None, RequestKind::Write), Outcome::PreconditionFailed);
        assert_eq!(evaluate(&any, Some(&tag("x")), RequestKind::Write), Outcome::Proceed);
    }

    #[test]
    fn if_match_uses_strong_comparison() {
        let p = pre(Some("W/\"abc\""), None);
        assert_eq!(
            evaluate(&p, Some(&tag("abc")), RequestKind::Write),
            Outcome::PreconditionFailed
        );
    }

    #[test]
    fn if_match_accepts_lists() {
        let p = pre(Some("\"x\", \"abc\""), None);
        assert_eq!(evaluate(&p, Some(&tag("abc")), RequestKind::Write), Outcome::Proceed);
    }

    #[test]
    fn if_none_match_star() {
        let p = pre(None, Some("*"));
        assert_eq!(evaluate(&p, None, RequestKind::Write), Outcome::Proceed);
        assert_eq!(
            evaluate(&p, Some(&tag("a")), RequestKind::Write),
            Outcome::PreconditionFailed
        );
        assert_eq!(
            evaluate(&p, Some(&tag("a")), RequestKind::Read),
            Outcome::PreconditionFailed
        );
    }

    #[test]
    fn if_none_match_list_on_reads() {
        let current = tag("etag1");
        let p = pre(None, Some("\"r2d2c3po\", \"etag1\""));
        assert_eq!(evaluate(&p, Some(&current), RequestKind::Read), Outcome::NotModified);
        let miss = pre(None, Some("\"r2d2c3po\""));
        assert_eq!(evaluate(&miss, Some(&current), RequestKind::Read), Outcome::Proceed);
        assert_eq!(evaluate(&p, None, RequestKind::Read), Outcome::Proceed);
    }

    #[test]
    fn if_none_match_bare_tokens_match() {
        let p = pre(None, Some("r2d2c3po, \"etag1\""));
        assert_eq!(evaluate(&p, Some(&tag("etag1")), RequestKind::Read), Outcome::NotModified);
    }

    #[test]
    fn if_none_match_list_on_writes() {
        let p = pre(None, Some("\"etag1\""));
        assert_eq!(
            evaluate(&p, Some(&tag("etag1")), RequestKind::Write),
            Outcome::PreconditionFailed
        );
    }

    #[test]
    fn if_none_match_is_weak() {
        let p = pre(None, Some("W/\"etag1\""));
        assert_eq!(evaluate(&p, Some(&tag("etag1")), RequestKind::Read), Outcome::NotModified);
    }

    #[test]
    fn if_match_short_circuits() {
        // If-None-Match alone would yield NotModified, but If-Match fails first.
        let p = pre(Some("\"other\""), Some("\"etag1\""));
        assert_eq!(
            evaluate(&p, Some(&tag("etag1")), RequestKind::Read),
            Outcome::PreconditionFailed
        );
    }

    #[test]
    fn split_respects_quotes() {
        let items: Vec<&str> = split_list("\"a,b\", \"c\" ,, ").collect();
        assert_eq!(items, vec!["\"a,b\"", "\"c\""]);
    }

    #[test]
    fn from_headers_combines_lines() {
        let mut headers = HeaderMap::new();
        headers.append(IF_NONE_MATCH, HeaderValue::from_static("\"a\""));
        headers.append(IF_NONE_MATCH, HeaderValue::from_static("\"b\""));
        headers.insert(IF_MATCH, HeaderValue::from_static("*"));
        let p = Preconditions::from_headers(&headers);
        assert_eq!(p.if_match, Some(TagList::Any));
        assert_eq!(
            p.if_none_match,
            Some(TagList::Tags(vec![tag("a"), tag("b")]))
        );
    }
}
