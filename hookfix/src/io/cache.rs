//! Cache directory layout under `<root>/.cache`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Canonical cache paths for a repository root.
///
/// pre-commit's own caches are redirected here via the environment overlay
/// (see [`crate::io::config::lint_env_overlay`]) so hook environments stay
/// self-contained inside the repository.
#[derive(Debug, Clone)]
pub struct CachePaths {
    pub root: PathBuf,
    pub cache_dir: PathBuf,
    pub pre_commit_home: PathBuf,
    pub iterations_dir: PathBuf,
}

impl CachePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let cache_dir = root.join(".cache");
        let pre_commit_home = cache_dir.join("pre-commit");
        let iterations_dir = cache_dir.join("hookfix").join("iterations");
        Self {
            root,
            cache_dir,
            pre_commit_home,
            iterations_dir,
        }
    }

    /// Create the cache directories. Safe to call when they already exist.
    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.pre_commit_home)
            .with_context(|| format!("create {}", self.pre_commit_home.display()))?;
        fs::create_dir_all(&self.iterations_dir)
            .with_context(|| format!("create {}", self.iterations_dir.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_paths_are_stable() {
        let paths = CachePaths::new("/repo");

        assert_eq!(paths.cache_dir, Path::new("/repo/.cache"));
        assert_eq!(paths.pre_commit_home, Path::new("/repo/.cache/pre-commit"));
        assert!(
            paths
                .iterations_dir
                .ends_with(Path::new(".cache/hookfix/iterations"))
        );
    }

    #[test]
    fn ensure_is_idempotent() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = CachePaths::new(temp.path());

        paths.ensure().expect("first ensure");
        assert!(paths.pre_commit_home.is_dir());
        assert!(paths.iterations_dir.is_dir());

        // Directories already exist; creating them again must not fail.
        paths.ensure().expect("second ensure");
    }
}
