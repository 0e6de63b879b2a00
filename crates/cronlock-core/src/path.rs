//! Validated hierarchical namespace paths.

use std::fmt;
use std::str::FromStr;

use crate::error::CoordinationError;

/// An absolute path in the coordination service's namespace.
///
/// Always starts with `/`, never ends with one, and has no empty
/// components. Owned and dynamically sized; child paths are built with
/// [`LockPath::join`] rather than manual buffer arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LockPath(String);

impl LockPath {
    /// Parses and validates an absolute path.
    pub fn parse(s: &str) -> Result<Self, CoordinationError> {
        if !s.starts_with('/') {
            return Err(CoordinationError::InvalidPath(format!(
                "path must be absolute: {s:?}"
            )));
        }
        if s.len() > 1 && s.ends_with('/') {
            return Err(CoordinationError::InvalidPath(format!(
                "path must not end with '/': {s:?}"
            )));
        }
        if s[1..].split('/').any(|segment| segment.is_empty()) && s.len() > 1 {
            return Err(CoordinationError::InvalidPath(format!(
                "path has an empty component: {s:?}"
            )));
        }
        Ok(Self(s.to_string()))
    }

    /// The root of the namespace.
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Appends one child component.
    pub fn join(&self, child: &str) -> Result<Self, CoordinationError> {
        if child.is_empty() || child.contains('/') {
            return Err(CoordinationError::InvalidPath(format!(
                "invalid child component: {child:?}"
            )));
        }
        if self.0 == "/" {
            Ok(Self(format!("/{child}")))
        } else {
            Ok(Self(format!("{}/{child}", self.0)))
        }
    }

    /// The parent path, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.0 == "/" {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => None,
        }
    }

    /// The last path component, or `None` for the root.
    pub fn name(&self) -> Option<&str> {
        if self.0 == "/" {
            None
        } else {
            self.0.rsplit('/').next()
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LockPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LockPath {
    type Err = CoordinationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_absolute_paths() {
        assert!(LockPath::parse("/xlock").is_ok());
        assert!(LockPath::parse("/jobs/nightly").is_ok());
        assert!(LockPath::parse("/").is_ok());
    }

    #[test]
    fn rejects_relative_and_malformed_paths() {
        assert!(LockPath::parse("xlock").is_err());
        assert!(LockPath::parse("/xlock/").is_err());
        assert!(LockPath::parse("/a//b").is_err());
        assert!(LockPath::parse("").is_err());
    }

    #[test]
    fn join_builds_child_paths() {
        let base = LockPath::parse("/xlock").unwrap();
        let child = base.join("x-0000000000000001-").unwrap();
        assert_eq!(child.as_str(), "/xlock/x-0000000000000001-");

        let root_child = LockPath::root().join("xlock").unwrap();
        assert_eq!(root_child.as_str(), "/xlock");
    }

    #[test]
    fn join_rejects_bad_components() {
        let base = LockPath::parse("/xlock").unwrap();
        assert!(base.join("").is_err());
        assert!(base.join("a/b").is_err());
    }

    #[test]
    fn parent_and_name() {
        let p = LockPath::parse("/jobs/nightly").unwrap();
        assert_eq!(p.parent().unwrap().as_str(), "/jobs");
        assert_eq!(p.name(), Some("nightly"));

        let top = LockPath::parse("/jobs").unwrap();
        assert_eq!(top.parent().unwrap().as_str(), "/");
        assert!(LockPath::root().parent().is_none());
        assert!(LockPath::root().name().is_none());
    }
}
