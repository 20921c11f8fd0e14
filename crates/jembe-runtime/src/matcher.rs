//! Glob matching on exec names.
//!
//! Listener source patterns and `emit(..).to(..)` destinations are glob
//! expressions over exec-name segments, resolved against an owning
//! exec name when relative:
//!
//! | Token | Matches |
//! |-------|---------|
//! | `name` | segment `name` with no key |
//! | `name.*` | segment `name` with any key (including none) |
//! | `name.<key>` | exact segment |
//! | `*` | any single keyless segment |
//! | `*.*` | any single segment, keyed or not |
//! | `**` | zero or more segments |
//! | `..` | ascends during relative resolution |
//!
//! A trailing `/.` keeps the owner on the matched path: the candidate
//! must additionally be the owner itself or one of its ancestors, so
//! `/**/.` reads "any ancestor of me, myself included".

use jembe_types::{ExecName, Segment};

#[derive(Debug, Clone, PartialEq, Eq)]
enum KeyPat {
    None,
    Any,
    Exact(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Many,
    Seg { name: Option<String>, key: KeyPat },
}

impl Token {
    fn parse(raw: &str) -> Self {
        if raw == "**" {
            return Self::Many;
        }
        let seg = Segment::split(raw);
        let name = (seg.name != "*").then(|| seg.name.to_string());
        let key = if !raw.contains('.') {
            KeyPat::None
        } else if seg.key == "*" {
            KeyPat::Any
        } else {
            KeyPat::Exact(seg.key.to_string())
        };
        Self::Seg { name, key }
    }

    fn exact(seg: Segment<'_>) -> Self {
        Self::Seg {
            name: Some(seg.name.to_string()),
            key: if seg.key.is_empty() {
                KeyPat::None
            } else {
                KeyPat::Exact(seg.key.to_string())
            },
        }
    }

    fn accepts(&self, seg: Segment<'_>) -> bool {
        match self {
            Self::Many => true,
            Self::Seg { name, key } => {
                if let Some(name) = name {
                    if name != seg.name {
                        return false;
                    }
                }
                match key {
                    KeyPat::Any => true,
                    KeyPat::None => seg.key.is_empty(),
                    KeyPat::Exact(k) => k == seg.key,
                }
            }
        }
    }
}

/// A compiled source pattern, resolved against its owner.
#[derive(Debug, Clone)]
pub struct Matcher {
    tokens: Vec<Token>,
    owner: ExecName,
    owner_on_path: bool,
    /// Relative resolution walked above the root; nothing matches.
    broken: bool,
}

impl Matcher {
    /// Compiles `pattern`, resolving relative forms against `owner`.
    #[must_use]
    pub fn compile(pattern: &str, owner: &ExecName) -> Self {
        let (body, owner_on_path) = match pattern.strip_suffix("/.") {
            Some(stripped) => (stripped, true),
            None => (pattern, false),
        };

        let mut tokens = Vec::new();
        let mut broken = false;
        let relative = !body.starts_with('/');
        if relative {
            tokens.extend(owner.segments().map(Token::exact));
        }
        let raw_segments = if relative {
            body.split('/')
        } else {
            body[1..].split('/')
        };
        for raw in raw_segments {
            match raw {
                "" | "." => {}
                ".." => {
                    if tokens.pop().is_none() {
                        broken = true;
                    }
                }
                other => tokens.push(Token::parse(other)),
            }
        }
        if tokens.is_empty() {
            broken = true;
        }

        Self {
            tokens,
            owner: owner.clone(),
            owner_on_path,
            broken,
        }
    }

    /// Tests a candidate exec name.
    #[must_use]
    pub fn matches(&self, candidate: &ExecName) -> bool {
        if self.broken {
            return false;
        }
        if self.owner_on_path
            && candidate != &self.owner
            && !candidate.is_ancestor_of(&self.owner)
        {
            return false;
        }
        let segments: Vec<Segment<'_>> = candidate.segments().collect();
        match_from(&self.tokens, &segments)
    }
}

fn match_from(tokens: &[Token], segments: &[Segment<'_>]) -> bool {
    match tokens.first() {
        None => segments.is_empty(),
        Some(Token::Many) => (0..=segments.len())
            .any(|skip| match_from(&tokens[1..], &segments[skip..])),
        Some(token) => {
            !segments.is_empty()
                && token.accepts(segments[0])
                && match_from(&tokens[1..], &segments[1..])
        }
    }
}

/// Tests `candidate` against an optional pattern owned by `owner`.
///
/// An absent pattern matches everything.
#[must_use]
pub fn glob_match(pattern: Option<&str>, owner: &ExecName, candidate: &ExecName) -> bool {
    match pattern {
        None => true,
        Some(p) => Matcher::compile(p, owner).matches(candidate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(s: &str) -> ExecName {
        ExecName::parse(s).unwrap()
    }

    fn hit(pattern: &str, owner: &str, candidate: &str) -> bool {
        glob_match(Some(pattern), &e(owner), &e(candidate))
    }

    #[test]
    fn absent_pattern_matches_anything() {
        assert!(glob_match(None, &e("/a"), &e("/anything/at.all")));
    }

    #[test]
    fn absolute_literals() {
        assert!(hit("/cpage/counter.a", "/x", "/cpage/counter.a"));
        assert!(!hit("/cpage/counter.a", "/x", "/cpage/counter.b"));
        assert!(!hit("/cpage/counter.a", "/x", "/cpage/counter"));
    }

    #[test]
    fn key_wildcards() {
        assert!(hit("/cpage/counter.*", "/x", "/cpage/counter.a"));
        assert!(hit("/cpage/counter.*", "/x", "/cpage/counter"));
        assert!(!hit("/cpage/counter", "/x", "/cpage/counter.a"));
    }

    #[test]
    fn segment_wildcards() {
        assert!(hit("/cpage/*", "/x", "/cpage/counter"));
        assert!(!hit("/cpage/*", "/x", "/cpage/counter.a"));
        assert!(hit("/cpage/*.*", "/x", "/cpage/counter.a"));
        assert!(hit("/cpage/*.*", "/x", "/cpage/counter"));
        assert!(!hit("/cpage/*", "/x", "/cpage/a/b"));
    }

    #[test]
    fn double_star_spans_segments() {
        assert!(hit("/**", "/x", "/a"));
        assert!(hit("/**", "/x", "/a/b.k/c"));
        assert!(hit("/cpage/**/row.*", "/x", "/cpage/list/rows/row.7"));
        assert!(hit("/cpage/**/row.*", "/x", "/cpage/row.7"));
        assert!(!hit("/cpage/**/row.*", "/x", "/other/row.7"));
    }

    #[test]
    fn relative_resolution() {
        // Owner /cpage/list: "./row.*" is its direct keyed child.
        assert!(hit("./row.*", "/cpage/list", "/cpage/list/row.1"));
        assert!(!hit("./row.*", "/cpage/list", "/cpage/row.1"));
        // "../counter" is a sibling.
        assert!(hit("../counter", "/cpage/list", "/cpage/counter"));
        assert!(!hit("../counter", "/cpage/list", "/cpage/list/counter"));
    }

    #[test]
    fn ascending_above_root_matches_nothing() {
        assert!(!hit("../../x", "/cpage", "/x"));
    }

    #[test]
    fn trailing_dot_keeps_owner_on_path() {
        // Any ancestor of the owner, owner included.
        assert!(hit("/**/.", "/cpage/list/row.1", "/cpage"));
        assert!(hit("/**/.", "/cpage/list/row.1", "/cpage/list"));
        assert!(hit("/**/.", "/cpage/list/row.1", "/cpage/list/row.1"));
        assert!(!hit("/**/.", "/cpage/list/row.1", "/cpage/counter"));
        assert!(!hit("/**/.", "/cpage/list/row.1", "/cpage/list/row.2"));
    }

    #[test]
    fn keyed_segments_in_relative_base() {
        assert!(hit("./child", "/cpage/tab.main", "/cpage/tab.main/child"));
        assert!(!hit("./child", "/cpage/tab.main", "/cpage/tab.other/child"));
    }
}
