//! Path-scope filters
//!
//! Restricts a run to objects at or below user-supplied paths.

use crate::error::ScopeError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Set of canonical scope paths; empty means unrestricted
#[derive(Debug, Clone, Default)]
pub struct ScopeFilter {
    paths: Vec<PathBuf>,
}

impl ScopeFilter {
    /// Resolve scope arguments, failing on paths that do not exist
    pub fn new(paths: &[PathBuf]) -> Result<Self, ScopeError> {
        let paths = paths
            .iter()
            .map(|path| {
                fs::canonicalize(path).map_err(|source| match source.kind() {
                    ErrorKind::NotFound => ScopeError::NotFound { path: path.clone() },
                    _ => ScopeError::Unresolvable {
                        path: path.clone(),
                        source,
                    },
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { paths })
    }

    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Whether any scope filter is active
    pub fn is_active(&self) -> bool {
        !self.paths.is_empty()
    }

    /// Whether `path` (absolute) lies at or below one of the scope paths
    pub fn contains(&self, path: &Path) -> bool {
        !self.is_active() || self.paths.iter().any(|scope| path.starts_with(scope))
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_unrestricted_contains_everything() {
        let scope = ScopeFilter::unrestricted();
        assert!(!scope.is_active());
        assert!(scope.contains(Path::new("/anything")));
    }

    #[test]
    fn test_contains_by_component() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("proj")).unwrap();
        fs::create_dir(dir.path().join("project2")).unwrap();

        let scope = ScopeFilter::new(&[dir.path().join("proj")]).unwrap();
        let base = fs::canonicalize(dir.path()).unwrap();
        assert!(scope.is_active());
        assert!(scope.contains(&base.join("proj")));
        assert!(scope.contains(&base.join("proj/x/y")));
        assert!(!scope.contains(&base.join("project2")));
        assert!(!scope.contains(&base));
    }

    #[test]
    fn test_missing_scope_path() {
        let dir = tempdir().unwrap();
        let err = ScopeFilter::new(&[dir.path().join("missing")]).unwrap_err();
        assert!(matches!(err, ScopeError::NotFound { .. }));
    }
}
