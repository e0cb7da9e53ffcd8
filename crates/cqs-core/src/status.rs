//! Index status reporting.

use serde::Serialize;

use crate::errors::CqsError;
use crate::state::IndexState;
use crate::workspace::Workspace;

/// Report of the current index state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    /// Repository root.
    pub root: String,

    /// Whether the repository has been indexed.
    pub indexed: bool,

    /// Whether a `.git` directory exists at the root.
    pub has_git: bool,

    /// Branch the index was built on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    /// Short id of the last indexed commit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_commit: Option<String>,

    /// Embedding model the index was built with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,

    /// Embedding dimension.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<usize>,

    /// Chunks in the index.
    pub total_chunks: usize,

    /// Files reflected by the index.
    pub total_files: usize,

    /// On-disk size of the index directory in bytes.
    pub index_size_bytes: u64,

    /// When the last indexing run completed (ISO 8601).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_at: Option<String>,
}

/// Build a status report for a workspace.
pub fn build_status(workspace: &Workspace) -> Result<StatusReport, CqsError> {
    let state = IndexState::load(&workspace.state_path())?;
    let index_size_bytes = dir_size(&workspace.index_dir());

    let report = match state {
        Some(state) => StatusReport {
            root: workspace.root().display().to_string(),
            indexed: true,
            has_git: workspace.has_git(),
            last_commit: Some(state.last_commit[..state.last_commit.len().min(8)].to_string()),
            branch: Some(state.branch),
            embedding_model: Some(state.embedding_model),
            dimension: Some(state.dimension),
            total_chunks: state.total_chunks,
            total_files: state.total_files,
            index_size_bytes,
            indexed_at: Some(state.indexed_at.to_rfc3339()),
        },
        None => StatusReport {
            root: workspace.root().display().to_string(),
            indexed: false,
            has_git: workspace.has_git(),
            branch: None,
            last_commit: None,
            embedding_model: None,
            dimension: None,
            total_chunks: 0,
            total_files: 0,
            index_size_bytes,
            indexed_at: None,
        },
    };

    Ok(report)
}

/// Recursive size of a directory, zero if missing.
fn dir_size(path: &std::path::Path) -> u64 {
    let Ok(entries) = std::fs::read_dir(path) else {
        return 0;
    };

    entries
        .flatten()
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                dir_size(&path)
            } else {
                entry.metadata().map(|m| m.len()).unwrap_or(0)
            }
        })
        .sum()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_status_unindexed() {
        let temp = tempfile::tempdir().unwrap();
        let workspace = Workspace::from_root(temp.path()).unwrap();

        let report = build_status(&workspace).unwrap();
        assert!(!report.indexed);
        assert_eq!(report.total_chunks, 0);
        assert!(report.branch.is_none());
    }

    #[test]
    fn test_status_reflects_state() {
        let temp = tempfile::tempdir().unwrap();
        let workspace = Workspace::from_root(temp.path()).unwrap();
        workspace.ensure_layout().unwrap();

        let state = IndexState {
            last_commit: "abcdef0123456789".to_string(),
            branch: "main".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            dimension: 1536,
            total_chunks: 10,
            total_files: 3,
            indexed_at: Utc::now(),
            schema_version: 1,
        };
        state.save(&workspace.state_path()).unwrap();
        std::fs::write(workspace.index_dir().join("vectors.jsonl"), "x".repeat(100)).unwrap();

        let workspace = Workspace::from_root(temp.path()).unwrap();
        let report = build_status(&workspace).unwrap();

        assert!(report.indexed);
        assert_eq!(report.last_commit.as_deref(), Some("abcdef01"));
        assert_eq!(report.branch.as_deref(), Some("main"));
        assert_eq!(report.total_chunks, 10);
        assert!(report.index_size_bytes >= 100);
    }
}
