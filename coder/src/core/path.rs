//! Containment checks for paths named by directives and commands.
//!
//! Every path handed to a [`crate::io::store::ProjectStore`] is a
//! [`ProjectPath`], so nothing can resolve outside the project root through
//! `..`, absolute paths or drive prefixes.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::core::error::ProjectError;

/// A normalized, `/`-separated path relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProjectPath(String);

impl ProjectPath {
    /// Validate a relative path. `.` segments are dropped.
    pub fn parse(raw: &str) -> Result<Self, ProjectError> {
        let escape = || ProjectError::PathEscape(raw.to_string());
        let mut segments = Vec::new();
        for component in Path::new(raw).components() {
            match component {
                Component::Normal(name) => {
                    segments.push(name.to_str().ok_or_else(escape)?.to_string());
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(escape());
                }
            }
        }
        if segments.is_empty() {
            return Err(escape());
        }
        Ok(Self(segments.join("/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve against `root`.
    pub fn to_path(&self, root: &Path) -> PathBuf {
        self.0.split('/').fold(root.to_path_buf(), |acc, seg| acc.join(seg))
    }

    /// Final segment, used for well-known filename matching.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for ProjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validate a project name: exactly one normal path component.
pub fn validate_project_name(name: &str) -> Result<&str, ProjectError> {
    let name = name.trim();
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(name),
        _ => Err(ProjectError::PathEscape(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_nested_relative_paths() {
        let path = ProjectPath::parse("./src//components/App.js").expect("valid");
        assert_eq!(path.as_str(), "src/components/App.js");
        assert_eq!(path.file_name(), "App.js");
    }

    #[test]
    fn rejects_parent_traversal_anywhere() {
        for raw in ["../x", "a/../../x", "a/..", "src/../main.py"] {
            let err = ProjectPath::parse(raw).unwrap_err();
            assert!(matches!(err, ProjectError::PathEscape(_)), "{raw}");
        }
    }

    #[test]
    fn rejects_absolute_and_empty() {
        assert!(ProjectPath::parse("/etc/passwd").is_err());
        assert!(ProjectPath::parse("").is_err());
        assert!(ProjectPath::parse(".").is_err());
    }

    #[test]
    fn resolves_under_root() {
        let root = Path::new("/tmp/work/demo");
        let path = ProjectPath::parse("a/b.txt").expect("valid");
        assert_eq!(path.to_path(root), root.join("a").join("b.txt"));
    }

    #[test]
    fn project_names_are_single_components() {
        assert_eq!(validate_project_name(" todo-app ").expect("valid"), "todo-app");
        assert!(validate_project_name("a/b").is_err());
        assert!(validate_project_name("..").is_err());
        assert!(validate_project_name("").is_err());
    }
}
