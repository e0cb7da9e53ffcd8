//! Persisted index state.
//!
//! `.cqs/state.json` records what the vector index currently reflects: the
//! last indexed commit, the embedding model the vectors were produced with,
//! and counters for status reporting. The state is written only after the
//! index itself has been flushed, so a crash mid-indexing re-indexes the
//! same change set instead of silently skipping it.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::CqsError;

// ============================================================================
// IndexState
// ============================================================================

/// On-disk state of the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexState {
    /// The commit id the index reflects.
    pub last_commit: String,

    /// The branch that commit was resolved on.
    pub branch: String,

    /// Embedding model the vectors were produced with.
    pub embedding_model: String,

    /// Embedding dimension.
    pub dimension: usize,

    /// Total chunks currently in the index.
    pub total_chunks: usize,

    /// Total files reflected by the index.
    pub total_files: usize,

    /// When the last indexing run completed.
    pub indexed_at: DateTime<Utc>,

    /// Schema version for future migrations.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
}

fn default_schema_version() -> u32 {
    1
}

impl IndexState {
    /// Load the state file if it exists.
    pub fn load(path: &Path) -> Result<Option<Self>, CqsError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| CqsError::StateIo {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let state: IndexState =
            serde_json::from_str(&content).map_err(|e| CqsError::StateParse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        debug!(
            "Loaded index state: commit {} on {}",
            &state.last_commit[..state.last_commit.len().min(8)],
            state.branch
        );
        Ok(Some(state))
    }

    /// Write the state file.
    pub fn save(&self, path: &Path) -> Result<(), CqsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| CqsError::StateIo {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        debug!("Saved index state to {:?}", path);
        Ok(())
    }

    /// Check that the configured embedding model matches what the index was
    /// built with.
    pub fn check_model(
        &self,
        active_model: &str,
        active_dimension: usize,
    ) -> Result<(), CqsError> {
        if self.embedding_model != active_model || self.dimension != active_dimension {
            return Err(CqsError::EmbeddingModelMismatch {
                index_model: self.embedding_model.clone(),
                index_dimension: self.dimension,
                active_model: active_model.to_string(),
                active_dimension,
            });
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> IndexState {
        IndexState {
            last_commit: "abcdef0123456789".to_string(),
            branch: "main".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            dimension: 1536,
            total_chunks: 42,
            total_files: 7,
            indexed_at: Utc::now(),
            schema_version: 1,
        }
    }

    #[test]
    fn test_load_missing_returns_none() {
        let temp = tempfile::tempdir().unwrap();
        let loaded = IndexState::load(&temp.path().join("state.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("nested/state.json");

        let state = sample_state();
        state.save(&path).unwrap();

        let loaded = IndexState::load(&path).unwrap().unwrap();
        assert_eq!(loaded.last_commit, state.last_commit);
        assert_eq!(loaded.total_chunks, 42);
        assert_eq!(loaded.branch, "main");
    }

    #[test]
    fn test_corrupt_state_is_parse_error() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = IndexState::load(&path).unwrap_err();
        assert!(matches!(err, CqsError::StateParse { .. }));
    }

    #[test]
    fn test_model_check() {
        let state = sample_state();
        assert!(state.check_model("text-embedding-3-small", 1536).is_ok());

        let err = state.check_model("other-model", 1536).unwrap_err();
        assert!(matches!(err, CqsError::EmbeddingModelMismatch { .. }));

        let err = state.check_model("text-embedding-3-small", 768).unwrap_err();
        assert!(matches!(err, CqsError::EmbeddingModelMismatch { .. }));
    }
}
