//! Route-pattern compilation and matching.

use std::collections::{HashMap, HashSet};

use regex::Regex;
use serde_json::Value;

use crate::error::PatternError;
use crate::matcher::Captures;
use crate::request::percent_decode;

/// The matching discipline of one capture placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureKind {
    /// One or more decimal digits, converted to an integer value.
    Int,
    /// Shortest non-empty run of non-separator characters.
    Str,
    /// Shortest non-empty run of any characters, separators included.
    PathTail,
}

impl CaptureKind {
    fn parse(kind: &str) -> Option<Self> {
        match kind {
            "int" => Some(Self::Int),
            "string" => Some(Self::Str),
            "path" => Some(Self::PathTail),
            _ => None,
        }
    }

    const fn regex_fragment(self) -> &'static str {
        match self {
            Self::Int => r"\d+",
            Self::Str => "[^/]+?",
            Self::PathTail => ".+?",
        }
    }
}

/// A segment of a compiled pattern.
#[derive(Debug, Clone)]
pub enum Segment {
    /// Literal text, matched verbatim.
    Literal(String),
    /// A named, typed capture.
    Capture {
        /// Declared capture name.
        name: String,
        /// Matching discipline.
        kind: CaptureKind,
    },
}

/// A compiled route pattern.
///
/// Patterns interleave literal text with placeholders written `<name>` or
/// `<kind:name>`, where `kind` is one of `int`, `string` (the default when
/// omitted) or `path`:
///
/// ```
/// use cascade_router::PathPattern;
///
/// let pattern = PathPattern::compile("/posts/<int:id>", false).unwrap();
/// let captures = pattern.match_path("/posts/42").unwrap();
/// assert_eq!(captures.get("id").and_then(|v| v.as_i64()), Some(42));
/// ```
///
/// A partial pattern is unanchored at the end: it may consume only a prefix
/// of the subject path, and the unconsumed suffix is reported as
/// `remaining` for nested dispatch.
#[derive(Debug, Clone)]
pub struct PathPattern {
    pattern: String,
    segments: Vec<Segment>,
    regex: Regex,
    partial: bool,
}

impl PathPattern {
    /// Compiles a pattern string.
    ///
    /// Fails if a placeholder names an unknown capture kind, if a capture
    /// name is not an identifier, or if two captures share a name.
    pub fn compile(pattern: &str, partial: bool) -> Result<Self, PatternError> {
        let mut segments = Vec::new();
        let mut seen = HashSet::new();
        let mut rest = pattern;

        // Greedily extract the earliest placeholder; text before it is a
        // literal segment. An unterminated `<` is literal text.
        loop {
            let Some(open) = rest.find('<') else { break };
            let Some(close) = rest[open..].find('>') else { break };

            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }

            let placeholder = &rest[open + 1..open + close];
            let (kind, name) = match placeholder.split_once(':') {
                Some((kind, name)) => {
                    let kind = CaptureKind::parse(kind).ok_or_else(|| {
                        PatternError::UnknownKind {
                            pattern: pattern.to_string(),
                            kind: kind.to_string(),
                        }
                    })?;
                    (kind, name)
                }
                None => (CaptureKind::Str, placeholder),
            };

            if !is_identifier(name) {
                return Err(PatternError::InvalidName {
                    pattern: pattern.to_string(),
                    name: name.to_string(),
                });
            }
            if !seen.insert(name.to_string()) {
                return Err(PatternError::DuplicateName {
                    pattern: pattern.to_string(),
                    name: name.to_string(),
                });
            }

            segments.push(Segment::Capture {
                name: name.to_string(),
                kind,
            });
            rest = &rest[open + close + 1..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        let mut regex_str = String::from("^");
        for segment in &segments {
            match segment {
                Segment::Literal(text) => regex_str.push_str(&regex::escape(text)),
                Segment::Capture { name, kind } => {
                    regex_str.push_str("(?P<");
                    regex_str.push_str(name);
                    regex_str.push('>');
                    regex_str.push_str(kind.regex_fragment());
                    regex_str.push(')');
                }
            }
        }
        if !partial {
            regex_str.push('$');
        }

        let regex = Regex::new(&regex_str).map_err(|source| PatternError::Regex {
            pattern: pattern.to_string(),
            source,
        })?;

        Ok(Self {
            pattern: pattern.to_string(),
            segments,
            regex,
            partial,
        })
    }

    /// Attempts to match a subject path against this pattern.
    ///
    /// On success, `matched` is the consumed prefix, `named` holds the
    /// type-converted capture values (integers for `int`, percent-decoded
    /// text otherwise) and `remaining` is the unconsumed suffix for partial
    /// patterns. On failure returns `None`; no partial captures are ever
    /// observable.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<Captures> {
        let caps = self.regex.captures(path)?;
        let whole = caps.get(0)?;

        let mut named = HashMap::new();
        for segment in &self.segments {
            if let Segment::Capture { name, kind } = segment {
                let text = caps.name(name)?.as_str();
                named.insert(name.clone(), convert(*kind, text)?);
            }
        }

        Some(Captures {
            matched: whole.as_str().to_string(),
            named,
            remaining: self
                .partial
                .then(|| path[whole.end()..].to_string()),
        })
    }

    /// Returns the original pattern string.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns true if the pattern is unanchored at the end.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.partial
    }

    /// Returns the parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn convert(kind: CaptureKind, text: &str) -> Option<Value> {
    match kind {
        // The regex guarantees digits; values that overflow i64 reject
        // the match rather than wrapping.
        CaptureKind::Int => text.parse::<i64>().ok().map(Value::from),
        CaptureKind::Str | CaptureKind::PathTail => Some(Value::String(percent_decode(text))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchored(pattern: &str) -> PathPattern {
        PathPattern::compile(pattern, false).unwrap()
    }

    #[test]
    fn test_literal_pattern() {
        let pattern = anchored("/users");
        assert!(pattern.match_path("/users").is_some());
        assert!(pattern.match_path("/posts").is_none());
        assert!(pattern.match_path("/users/42").is_none());
    }

    #[test]
    fn test_default_kind_is_string() {
        let pattern = anchored("/pages/<name>");
        let captures = pattern.match_path("/pages/about").unwrap();
        assert_eq!(
            captures.get("name").and_then(|v| v.as_str()),
            Some("about")
        );
        assert_eq!(captures.matched, "/pages/about");
        assert_eq!(captures.remaining, None);
    }

    #[test]
    fn test_int_capture() {
        let pattern = anchored("/users/<int:id>");
        let captures = pattern.match_path("/users/42").unwrap();
        assert_eq!(captures.get("id").and_then(|v| v.as_i64()), Some(42));
    }

    #[test]
    fn test_int_rejects_non_digits() {
        let pattern = anchored("/users/<int:id>");
        assert!(pattern.match_path("/users/abc").is_none());
        assert!(pattern.match_path("/users/4x2").is_none());
    }

    #[test]
    fn test_int_rejects_overflow() {
        let pattern = anchored("/n/<int:value>");
        assert!(pattern.match_path("/n/99999999999999999999").is_none());
        assert!(pattern.match_path("/n/123").is_some());
    }

    #[test]
    fn test_string_never_crosses_separator() {
        let pattern = anchored("/pages/<name>");
        assert!(pattern.match_path("/pages/a/b").is_none());
    }

    #[test]
    fn test_path_crosses_separator() {
        let pattern = anchored("/files/<path:rest>");
        let captures = pattern.match_path("/files/docs/readme.md").unwrap();
        assert_eq!(
            captures.get("rest").and_then(|v| v.as_str()),
            Some("docs/readme.md")
        );
    }

    #[test]
    fn test_multiple_captures_round_trip() {
        let pattern = anchored("/posts/<int:post_id>/comments/<int:comment_id>");
        let captures = pattern.match_path("/posts/42/comments/7").unwrap();
        assert_eq!(captures.get("post_id").and_then(|v| v.as_i64()), Some(42));
        assert_eq!(captures.get("comment_id").and_then(|v| v.as_i64()), Some(7));
        assert_eq!(captures.matched, "/posts/42/comments/7");
    }

    #[test]
    fn test_lazy_string_stops_at_literal() {
        let pattern = anchored("/a/<name>/edit");
        let captures = pattern.match_path("/a/thing/edit").unwrap();
        assert_eq!(captures.get("name").and_then(|v| v.as_str()), Some("thing"));
    }

    #[test]
    fn test_partial_match_leaves_remainder() {
        let pattern = PathPattern::compile("/users/", true).unwrap();
        let captures = pattern.match_path("/users/42/edit").unwrap();
        assert_eq!(captures.matched, "/users/");
        assert_eq!(captures.remaining.as_deref(), Some("42/edit"));
    }

    #[test]
    fn test_partial_match_with_empty_remainder() {
        let pattern = PathPattern::compile("/users/", true).unwrap();
        let captures = pattern.match_path("/users/").unwrap();
        assert_eq!(captures.remaining.as_deref(), Some(""));
    }

    #[test]
    fn test_percent_decoding_of_captures() {
        let pattern = anchored("/pages/<name>");
        let captures = pattern.match_path("/pages/a%20b").unwrap();
        assert_eq!(captures.get("name").and_then(|v| v.as_str()), Some("a b"));
    }

    #[test]
    fn test_undeclared_name_is_absent() {
        let pattern = anchored("/pages/<name>");
        let captures = pattern.match_path("/pages/about").unwrap();
        assert!(captures.get("missing").is_none());
    }

    #[test]
    fn test_unknown_kind_is_an_error() {
        let err = PathPattern::compile("/x/<float:v>", false).unwrap_err();
        assert!(matches!(err, PatternError::UnknownKind { .. }));
    }

    #[test]
    fn test_malformed_name_is_an_error() {
        let err = PathPattern::compile("/x/<int:9bad>", false).unwrap_err();
        assert!(matches!(err, PatternError::InvalidName { .. }));
        let err = PathPattern::compile("/x/<>", false).unwrap_err();
        assert!(matches!(err, PatternError::InvalidName { .. }));
    }

    #[test]
    fn test_duplicate_name_is_an_error() {
        let err = PathPattern::compile("/x/<a>/y/<a>", false).unwrap_err();
        assert!(matches!(err, PatternError::DuplicateName { .. }));
    }

    #[test]
    fn test_unterminated_placeholder_is_literal() {
        let pattern = anchored("/x/<oops");
        assert!(pattern.match_path("/x/<oops").is_some());
    }
}
