//! Materialized resource paths.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// A `/`-joined path locating a resource inside its aggregate.
///
/// The empty path is the aggregate root. A node's path includes its own name
/// as the last segment; creation payloads carry the *parent* path instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourcePath {
    segments: Vec<String>,
}

impl ResourcePath {
    /// The aggregate root.
    #[must_use]
    pub const fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Parses a raw path, ignoring empty segments.
    ///
    /// # Errors
    /// Returns `InvalidPath` if a segment is `.` or `..`.
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let segments: Vec<String> = raw
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();
        if segments.iter().any(|s| s == "." || s == "..") {
            return Err(DomainError::InvalidPath(raw.to_string()));
        }
        Ok(Self { segments })
    }

    /// Builds a path from already split segments.
    #[must_use]
    pub fn from_segments(segments: Vec<String>) -> Self {
        Self { segments }
    }

    /// The `/`-joined form.
    #[must_use]
    pub fn raw(&self) -> String {
        self.segments.join("/")
    }

    /// Path segments in order.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// True for the aggregate root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Last segment, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Path with one more segment.
    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Self { segments }
    }

    /// Path without its last segment. The root is its own parent.
    #[must_use]
    pub fn parent(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();
        Self { segments }
    }

    /// Concatenates `other` beneath this path.
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    /// True if `prefix` is this path or one of its ancestors.
    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// The remainder after `prefix`, if this path lies under it.
    #[must_use]
    pub fn strip_prefix(&self, prefix: &Self) -> Option<Self> {
        self.segments
            .strip_prefix(prefix.segments.as_slice())
            .map(|rest| Self::from_segments(rest.to_vec()))
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw())
    }
}

impl TryFrom<String> for ResourcePath {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ResourcePath> for String {
    fn from(path: ResourcePath) -> Self {
        path.raw()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_raw() {
        let path = ResourcePath::parse("endpoints//users/").unwrap();
        assert_eq!(path.segments(), ["endpoints", "users"]);
        assert_eq!(path.raw(), "endpoints/users");
        assert_eq!(path.name(), Some("users"));
    }

    #[test]
    fn test_parse_rejects_traversal() {
        assert!(ResourcePath::parse("endpoints/../secrets").is_err());
    }

    #[test]
    fn test_join_and_strip_prefix() {
        let base = ResourcePath::parse("endpoints/f").unwrap();
        let rel = ResourcePath::parse("x/y").unwrap();
        let joined = base.join(&rel);
        assert_eq!(joined.raw(), "endpoints/f/x/y");
        assert_eq!(joined.strip_prefix(&base), Some(rel));
        assert!(joined.starts_with(&base));
        assert_eq!(base.strip_prefix(&joined), None);
    }

    #[test]
    fn test_root_parent_is_root() {
        assert!(ResourcePath::root().parent().is_root());
        assert_eq!(ResourcePath::parse("a/b").unwrap().parent().raw(), "a");
    }

    #[test]
    fn test_serde_as_string() {
        let path = ResourcePath::parse("requests/auth").unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"requests/auth\"");
        let back: ResourcePath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }
}
