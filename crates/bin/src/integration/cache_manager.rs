//! Cache location and opening.
//!
//! The cache lives in a platform-specific directory unless `--db` or
//! `PBVAL_DB` names another file.

use pbval_data::{DataError, SqliteCache};
use std::path::{Path, PathBuf};

/// Get the default cache directory path.
///
/// Uses platform-specific cache directories:
/// - Linux: `~/.cache/pbval/`
/// - macOS: `~/Library/Caches/pbval/`
/// - Windows: `%LOCALAPPDATA%\pbval\`
pub(crate) fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pbval")
}

/// Get the default cache database path.
pub(crate) fn default_cache_path() -> PathBuf {
    default_cache_dir().join("pbval.db")
}

/// Cache path from the command line, or the default.
pub(crate) fn resolve_cache_path(configured: Option<PathBuf>) -> PathBuf {
    configured.unwrap_or_else(default_cache_path)
}

/// Open the cache, creating the directory if needed.
pub(crate) fn open_cache(path: &Path) -> Result<SqliteCache, DataError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    SqliteCache::new(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_path_is_named_after_the_tool() {
        let path = default_cache_path();
        assert!(path.ends_with("pbval/pbval.db"));
        assert_eq!(resolve_cache_path(Some(PathBuf::from("x.db"))), PathBuf::from("x.db"));
    }

    #[test]
    fn test_open_cache_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("pbval.db");
        open_cache(&path).unwrap();
        assert!(path.exists());
    }
}
