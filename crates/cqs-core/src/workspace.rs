//! Workspace detection and management.
//!
//! This module provides the [`Workspace`] type which represents a target
//! repository on disk, including its root path, the `.cqs` data directory,
//! and index-state presence.

use std::path::{Path, PathBuf};

use crate::constants::{ASK_LOG_FILENAME, CQS_DIR, INDEX_DIR, LOGS_DIR, STATE_FILENAME};
use crate::errors::CqsError;

// ============================================================================
// Helper Functions
// ============================================================================

/// Check if a path is a disk root (e.g., C:\ on Windows, / on Unix).
///
/// This prevents cqs from creating its data directory in dangerous locations
/// like the root of a filesystem.
fn is_disk_root(path: &Path) -> bool {
    if path.parent().is_some() {
        return false;
    }

    #[cfg(windows)]
    {
        if let Some(s) = path.to_str() {
            if s.len() >= 2 && s.chars().nth(1) == Some(':') {
                return true;
            }
        }
    }

    #[cfg(not(windows))]
    {
        if path == Path::new("/") {
            return true;
        }
    }

    path.canonicalize()
        .ok()
        .is_some_and(|p| p.parent().is_none())
}

// ============================================================================
// Workspace
// ============================================================================

/// A resolved cqs workspace.
///
/// Represents a repository directory that cqs operates on. Contains paths to
/// the `.cqs` data layout and metadata about the workspace state.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Absolute path to the repository root directory.
    root: PathBuf,

    /// Path to the cqs data directory (`.cqs`).
    cqs_root: PathBuf,

    /// Whether a `.git` directory exists at the root.
    has_git: bool,

    /// Whether the repository has been indexed (`.cqs/state.json` exists).
    indexed: bool,
}

impl Workspace {
    /// Create a `Workspace` from a repository root path.
    ///
    /// Validates that the path exists and is a directory, then probes for
    /// `.git` and `.cqs/state.json`.
    ///
    /// # Errors
    ///
    /// Returns [`CqsError::PathNotFound`] if the path does not exist or is
    /// not a directory, and [`CqsError::InvalidPath`] for a disk root.
    pub fn from_root(root: &Path) -> Result<Self, CqsError> {
        let root = root
            .canonicalize()
            .map_err(|_| CqsError::PathNotFound(root.display().to_string()))?;

        if !root.is_dir() {
            return Err(CqsError::PathNotFound(root.display().to_string()));
        }

        if is_disk_root(&root) {
            return Err(CqsError::InvalidPath(format!(
                "refusing to operate on a disk root: {}",
                root.display()
            )));
        }

        let cqs_root = root.join(CQS_DIR);
        let has_git = root.join(".git").exists();
        let indexed = cqs_root.join(STATE_FILENAME).exists();

        Ok(Self {
            root,
            cqs_root,
            has_git,
            indexed,
        })
    }

    /// The repository root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The cqs data directory (`<root>/.cqs`).
    pub fn cqs_root(&self) -> &Path {
        &self.cqs_root
    }

    /// The vector index directory (`<root>/.cqs/index`).
    pub fn index_dir(&self) -> PathBuf {
        self.cqs_root.join(INDEX_DIR)
    }

    /// The index state file (`<root>/.cqs/state.json`).
    pub fn state_path(&self) -> PathBuf {
        self.cqs_root.join(STATE_FILENAME)
    }

    /// The ask log file (`<root>/.cqs/logs/asks.jsonl`).
    pub fn ask_log_path(&self) -> PathBuf {
        self.cqs_root.join(LOGS_DIR).join(ASK_LOG_FILENAME)
    }

    /// Whether a `.git` directory exists at the root.
    pub fn has_git(&self) -> bool {
        self.has_git
    }

    /// Whether the repository has been indexed at least once.
    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    /// Create the `.cqs` directory layout if it does not exist.
    pub fn ensure_layout(&self) -> Result<(), CqsError> {
        std::fs::create_dir_all(self.index_dir())?;
        std::fs::create_dir_all(self.cqs_root.join(LOGS_DIR))?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_root_missing_path() {
        let err = Workspace::from_root(Path::new("/nonexistent/xyz987")).unwrap_err();
        assert!(matches!(err, CqsError::PathNotFound(_)));
    }

    #[test]
    fn test_from_root_rejects_disk_root() {
        let err = Workspace::from_root(Path::new("/")).unwrap_err();
        assert!(matches!(err, CqsError::InvalidPath(_)));
    }

    #[test]
    fn test_workspace_layout() {
        let temp = tempfile::tempdir().unwrap();
        let workspace = Workspace::from_root(temp.path()).unwrap();

        assert!(!workspace.is_indexed());
        assert!(!workspace.has_git());

        workspace.ensure_layout().unwrap();
        assert!(workspace.index_dir().exists());
        assert!(workspace.ask_log_path().parent().unwrap().exists());
    }

    #[test]
    fn test_indexed_detection() {
        let temp = tempfile::tempdir().unwrap();
        let workspace = Workspace::from_root(temp.path()).unwrap();
        workspace.ensure_layout().unwrap();
        std::fs::write(workspace.state_path(), "{}").unwrap();

        let reopened = Workspace::from_root(temp.path()).unwrap();
        assert!(reopened.is_indexed());
    }
}
