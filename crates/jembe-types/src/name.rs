//! Component name model.
//!
//! Two name spaces coexist on a page:
//!
//! - [`FullName`] identifies a *class* of components by its mount point
//!   in the hierarchy: `/cpage/counter`.
//! - [`ExecName`] identifies a *live instance* within a request by
//!   annotating each segment with an optional key: `/cpage/counter.first`.
//!
//! The key separator is `.`, at most one per segment. An empty key is
//! encoded as the bare name, so `exec_name_to_full_name` is a pure
//! suffix-drop per segment:
//!
//! ```
//! use jembe_types::ExecName;
//!
//! let exec = ExecName::parse("/cpage/counter.first").unwrap();
//! assert_eq!(exec.full_name().as_str(), "/cpage/counter");
//! assert_eq!(exec.key(), "first");
//! ```

use crate::error::JembeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One `/`-delimited piece of an exec name, split into name and key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    /// Component name within its parent.
    pub name: &'a str,
    /// Instance key; empty string when the segment carries no key.
    pub key: &'a str,
}

impl<'a> Segment<'a> {
    /// Splits a raw segment on the first `.`.
    #[must_use]
    pub fn split(raw: &'a str) -> Self {
        match raw.split_once('.') {
            Some((name, key)) => Self { name, key },
            None => Self { name: raw, key: "" },
        }
    }
}

fn validate_path(s: &str, allow_keys: bool) -> Result<(), JembeError> {
    if !s.starts_with('/') || s.len() < 2 {
        return Err(JembeError::InvalidName(format!(
            "name must start with '/' and have at least one segment: {s:?}"
        )));
    }
    for raw in s[1..].split('/') {
        if raw.is_empty() {
            return Err(JembeError::InvalidName(format!("empty segment in {s:?}")));
        }
        let dots = raw.matches('.').count();
        if dots > 1 || (dots == 1 && !allow_keys) {
            return Err(JembeError::InvalidName(format!(
                "segment {raw:?} in {s:?} has an unexpected '.'"
            )));
        }
        let seg = Segment::split(raw);
        if seg.name.is_empty() {
            return Err(JembeError::InvalidName(format!(
                "segment {raw:?} in {s:?} has an empty name"
            )));
        }
    }
    Ok(())
}

/// Hierarchical class name of a component, rooted at `/`.
///
/// Unique per application; independent of instance keys. The set of
/// full names is fixed at registry build time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FullName(String);

impl FullName {
    /// Parses and validates a full name.
    ///
    /// # Errors
    ///
    /// Returns [`JembeError::InvalidName`] if the path does not start
    /// with `/`, contains empty segments, or contains key separators.
    pub fn parse(s: impl Into<String>) -> Result<Self, JembeError> {
        let s = s.into();
        validate_path(&s, false)?;
        Ok(Self(s))
    }

    /// Builds a root-level page name from a bare component name.
    ///
    /// # Errors
    ///
    /// Returns [`JembeError::InvalidName`] on empty or `/`/`.`-bearing names.
    pub fn page(name: &str) -> Result<Self, JembeError> {
        Self::parse(format!("/{name}"))
    }

    /// Appends a child segment.
    ///
    /// # Errors
    ///
    /// Returns [`JembeError::InvalidName`] if `child` is not a bare name.
    pub fn child(&self, child: &str) -> Result<Self, JembeError> {
        Self::parse(format!("{}/{child}", self.0))
    }

    /// Returns the underlying path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last segment: the component's own name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or("")
    }

    /// Parent full name, or `None` for a page.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let idx = self.0.rfind('/')?;
        if idx == 0 {
            None
        } else {
            Some(Self(self.0[..idx].to_string()))
        }
    }

    /// `true` when this is a root page name (exactly one segment).
    #[must_use]
    pub fn is_page(&self) -> bool {
        self.0[1..].split('/').count() == 1
    }

    /// Number of segments.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0[1..].split('/').count()
    }

    /// Iterates segment names from the root down.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0[1..].split('/')
    }
}

impl fmt::Display for FullName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for FullName {
    type Error = JembeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<FullName> for String {
    fn from(value: FullName) -> Self {
        value.0
    }
}

/// Address of a live component instance within a request.
///
/// Each segment is `<name>` or `<name>.<key>`. Dropping every key
/// suffix yields the instance's [`FullName`]:
///
/// ```
/// use jembe_types::ExecName;
///
/// let e = ExecName::parse("/tasks/list/row.42").unwrap();
/// assert_eq!(e.full_name().as_str(), "/tasks/list/row");
/// assert_eq!(e.parent().unwrap().as_str(), "/tasks/list");
/// assert!(!e.is_page());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExecName(String);

impl ExecName {
    /// Parses and validates an exec name.
    ///
    /// # Errors
    ///
    /// Returns [`JembeError::InvalidName`] if the path does not start
    /// with `/`, contains empty segments, or a segment carries more
    /// than one key separator.
    pub fn parse(s: impl Into<String>) -> Result<Self, JembeError> {
        let s = s.into();
        validate_path(&s, true)?;
        Ok(Self(s))
    }

    /// Builds a root-level page exec name.
    ///
    /// # Errors
    ///
    /// Returns [`JembeError::InvalidName`] on malformed names.
    pub fn page(name: &str) -> Result<Self, JembeError> {
        Self::parse(format!("/{name}"))
    }

    /// Appends a child segment with an optional key (empty = no key).
    ///
    /// # Errors
    ///
    /// Returns [`JembeError::InvalidName`] if the resulting segment is
    /// malformed.
    pub fn child(&self, name: &str, key: &str) -> Result<Self, JembeError> {
        if key.is_empty() {
            Self::parse(format!("{}/{name}", self.0))
        } else {
            Self::parse(format!("{}/{name}.{key}", self.0))
        }
    }

    /// Returns the underlying path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Drops every segment's key suffix.
    #[must_use]
    pub fn full_name(&self) -> FullName {
        let mut out = String::with_capacity(self.0.len());
        for seg in self.segments() {
            out.push('/');
            out.push_str(seg.name);
        }
        FullName(out)
    }

    /// `true` when there is exactly one segment after the leading slash.
    #[must_use]
    pub fn is_page(&self) -> bool {
        !self.0[1..].contains('/')
    }

    /// Strips the last segment, or returns `None` for a page.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let idx = self.0.rfind('/')?;
        if idx == 0 {
            None
        } else {
            Some(Self(self.0[..idx].to_string()))
        }
    }

    /// Name of the last segment.
    #[must_use]
    pub fn name(&self) -> &str {
        self.last_segment().name
    }

    /// Key of the last segment; empty string when keyless.
    #[must_use]
    pub fn key(&self) -> &str {
        self.last_segment().key
    }

    fn last_segment(&self) -> Segment<'_> {
        let raw = self.0.rsplit('/').next().unwrap_or("");
        Segment::split(raw)
    }

    /// Number of segments.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0[1..].split('/').count()
    }

    /// Iterates `(name, key)` segments from the root down.
    pub fn segments(&self) -> impl Iterator<Item = Segment<'_>> {
        self.0[1..].split('/').map(Segment::split)
    }

    /// Every prefix path from the page root down to `self`, inclusive.
    ///
    /// `/a/b.k/c` yields `/a`, `/a/b.k`, `/a/b.k/c`. Used when the
    /// processor synthesises the initialise chain for a command target.
    #[must_use]
    pub fn prefixes(&self) -> Vec<Self> {
        let mut out = Vec::new();
        for (idx, ch) in self.0.char_indices().skip(1) {
            if ch == '/' {
                out.push(Self(self.0[..idx].to_string()));
            }
        }
        out.push(self.clone());
        out
    }

    /// `true` when `self` is a strict ancestor of `other`.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        other.0.len() > self.0.len()
            && other.0.starts_with(&self.0)
            && other.0.as_bytes()[self.0.len()] == b'/'
    }

    /// `true` when `other` is a direct child of `self`.
    #[must_use]
    pub fn is_direct_child(&self, other: &Self) -> bool {
        self.is_ancestor_of(other) && !other.0[self.0.len() + 1..].contains('/')
    }

    /// Returns the first segment of `child` relative to `self`.
    ///
    /// # Errors
    ///
    /// Returns [`JembeError::InvalidName`] if `child` is not a
    /// descendant of `self`.
    pub fn direct_child_name<'c>(&self, child: &'c Self) -> Result<&'c str, JembeError> {
        if !self.is_ancestor_of(child) {
            return Err(JembeError::InvalidName(format!(
                "{child} is not under {self}"
            )));
        }
        let rel = &child.0[self.0.len() + 1..];
        Ok(rel.split('/').next().unwrap_or(rel))
    }
}

impl fmt::Display for ExecName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ExecName {
    type Error = JembeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ExecName> for String {
    fn from(value: ExecName) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_to_full_drops_keys() {
        let e = ExecName::parse("/cpage/counter.first").unwrap();
        assert_eq!(e.full_name().as_str(), "/cpage/counter");

        let plain = ExecName::parse("/cpage/counter").unwrap();
        assert_eq!(plain.full_name().as_str(), "/cpage/counter");
    }

    #[test]
    fn page_detection() {
        assert!(ExecName::parse("/cpage").unwrap().is_page());
        assert!(!ExecName::parse("/cpage/counter").unwrap().is_page());
    }

    #[test]
    fn parent_strips_last_segment() {
        let e = ExecName::parse("/a/b.k/c").unwrap();
        assert_eq!(e.parent().unwrap().as_str(), "/a/b.k");
        assert!(ExecName::parse("/a").unwrap().parent().is_none());
    }

    #[test]
    fn key_and_name_of_last_segment() {
        let e = ExecName::parse("/cpage/counter.second").unwrap();
        assert_eq!(e.name(), "counter");
        assert_eq!(e.key(), "second");
        assert_eq!(ExecName::parse("/cpage").unwrap().key(), "");
    }

    #[test]
    fn direct_child_checks() {
        let parent = ExecName::parse("/cpage").unwrap();
        let child = ExecName::parse("/cpage/counter.a").unwrap();
        let grandchild = ExecName::parse("/cpage/counter.a/x").unwrap();

        assert!(parent.is_direct_child(&child));
        assert!(!parent.is_direct_child(&grandchild));
        assert_eq!(parent.direct_child_name(&grandchild).unwrap(), "counter.a");
        assert!(child.direct_child_name(&parent).is_err());
    }

    #[test]
    fn prefixes_from_root_down() {
        let e = ExecName::parse("/a/b.k/c").unwrap();
        let p: Vec<String> = e.prefixes().iter().map(|x| x.to_string()).collect();
        assert_eq!(p, vec!["/a", "/a/b.k", "/a/b.k/c"]);
    }

    #[test]
    fn rejects_malformed_names() {
        assert!(ExecName::parse("cpage").is_err());
        assert!(ExecName::parse("/").is_err());
        assert!(ExecName::parse("/a//b").is_err());
        assert!(ExecName::parse("/a/b.k.z").is_err());
        assert!(ExecName::parse("/.key").is_err());
        assert!(FullName::parse("/a/b.k").is_err());
    }

    #[test]
    fn serde_roundtrip_validates() {
        let e: ExecName = serde_json::from_str("\"/cpage/counter.x\"").unwrap();
        assert_eq!(e.as_str(), "/cpage/counter.x");
        assert!(serde_json::from_str::<ExecName>("\"broken\"").is_err());
        assert_eq!(serde_json::to_string(&e).unwrap(), "\"/cpage/counter.x\"");
    }

    #[test]
    fn ancestor_is_strict() {
        let a = ExecName::parse("/a").unwrap();
        let ab = ExecName::parse("/a/b").unwrap();
        let abc = ExecName::parse("/a/b/c").unwrap();
        let axy = ExecName::parse("/ax/y").unwrap();

        assert!(a.is_ancestor_of(&ab));
        assert!(a.is_ancestor_of(&abc));
        assert!(!a.is_ancestor_of(&a));
        assert!(!a.is_ancestor_of(&axy));
    }
}
