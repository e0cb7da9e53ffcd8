//! Common types used throughout cqs.
//!
//! This module contains domain types, option structs, and result types
//! used by the engine API and CLI.

use serde::{Deserialize, Serialize};

// ============================================================================
// ChunkId
// ============================================================================

/// Deterministic identifier for an indexed chunk.
///
/// Derived from the source path, the chunk ordinal within the file, and the
/// chunk text, so re-indexing an unchanged file produces the same ids and
/// re-indexing a changed file replaces its chunks via upsert.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(pub String);

impl ChunkId {
    /// Generate a chunk id from its identity components.
    pub fn generate(path: &str, ordinal: usize, text: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(path.as_bytes());
        hasher.update(&ordinal.to_le_bytes());
        hasher.update(text.as_bytes());
        let hash = hasher.finalize();
        // 128 bits is plenty of headroom against collisions at repo scale
        Self(hash.to_hex()[..32].to_string())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChunkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Command Options
// ============================================================================

/// Options for the `index` command.
#[derive(Debug, Default, Clone)]
pub struct IndexOptions {
    /// Index every tracked file instead of only the ones changed since the
    /// last indexed commit.
    pub all: bool,

    /// Skip the remote fetch/fast-forward before diffing.
    pub no_sync: bool,
}

/// Options shared by `search`, `ask`, and `eval` retrieval.
#[derive(Debug, Clone)]
pub struct RetrievalOptions {
    /// Number of chunks to return.
    pub top_k: usize,

    /// Use diversity-aware (MMR) re-ranking.
    pub mmr: bool,

    /// Number of candidates to fetch before MMR selection.
    pub fetch_k: usize,

    /// Relevance/diversity balance for MMR (0-1; lower favors diversity).
    pub lambda: f32,

    /// Drop results scoring below this threshold.
    pub min_score: Option<f32>,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            mmr: false,
            fetch_k: DEFAULT_FETCH_K,
            lambda: DEFAULT_MMR_LAMBDA,
            min_score: None,
        }
    }
}

/// Default number of chunks returned by retrieval.
pub const DEFAULT_TOP_K: usize = 5;

/// Default candidate pool size for MMR selection.
pub const DEFAULT_FETCH_K: usize = 20;

/// Default MMR relevance/diversity balance.
pub const DEFAULT_MMR_LAMBDA: f32 = 0.8;

// ============================================================================
// Command Results
// ============================================================================

/// Result of the `index` command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexResult {
    /// The commit id the index now reflects.
    pub commit: String,

    /// Short form of the commit id.
    pub commit_short: String,

    /// Number of files successfully loaded and indexed.
    pub indexed_files: usize,

    /// Number of files that failed to load.
    pub failed_files: usize,

    /// Number of files skipped (unknown type, too large, ignored dirs).
    pub skipped_files: usize,

    /// Number of chunks embedded and upserted.
    pub chunks_indexed: usize,

    /// Number of stale chunks removed (deleted files).
    pub chunks_deleted: usize,
}

impl IndexResult {
    /// Whether the run changed the index at all.
    pub fn is_noop(&self) -> bool {
        self.chunks_indexed == 0 && self.chunks_deleted == 0
    }
}

/// A chunk returned by retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievedChunk {
    /// Source file path, relative to the repository root.
    pub path: String,

    /// Chunk ordinal within the file.
    pub ordinal: usize,

    /// Detected language tag.
    pub language: String,

    /// The chunk text.
    pub text: String,

    /// Similarity score against the query.
    pub score: f32,
}

/// Result of the `ask` command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AskResult {
    /// The generated answer.
    pub answer: String,

    /// The chunks the answer was grounded on.
    pub sources: Vec<RetrievedChunk>,

    /// Whether diversity re-ranking was applied.
    pub mmr: bool,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_deterministic() {
        let a = ChunkId::generate("src/main.rs", 0, "fn main() {}");
        let b = ChunkId::generate("src/main.rs", 0, "fn main() {}");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn test_chunk_id_varies_by_component() {
        let base = ChunkId::generate("src/main.rs", 0, "fn main() {}");
        assert_ne!(base, ChunkId::generate("src/lib.rs", 0, "fn main() {}"));
        assert_ne!(base, ChunkId::generate("src/main.rs", 1, "fn main() {}"));
        assert_ne!(base, ChunkId::generate("src/main.rs", 0, "fn other() {}"));
    }

    #[test]
    fn test_retrieval_defaults() {
        let options = RetrievalOptions::default();
        assert_eq!(options.top_k, 5);
        assert_eq!(options.fetch_k, 20);
        assert!((options.lambda - 0.8).abs() < f32::EPSILON);
        assert!(!options.mmr);
    }

    #[test]
    fn test_index_result_noop() {
        let result = IndexResult {
            commit: "abc".into(),
            commit_short: "abc".into(),
            indexed_files: 0,
            failed_files: 0,
            skipped_files: 3,
            chunks_indexed: 0,
            chunks_deleted: 0,
        };
        assert!(result.is_noop());
    }
}
