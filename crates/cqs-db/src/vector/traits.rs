//! Vector index traits and core types.
//!
//! This module defines the core abstraction for vector storage backends.

use crate::error::DbResult;
use serde::{Deserialize, Serialize};

use super::metadata::VectorSearchFilter;

// ============================================================================
// VectorId
// ============================================================================

/// Unique identifier for a vector in the index.
///
/// Chunk identifiers are content-derived hashes produced by cqs-core, so the
/// id is an opaque string. Upserting a vector with an existing id replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VectorId(pub String);

impl VectorId {
    /// Create a new vector ID.
    pub fn new(id: impl Into<String>) -> Self {
        VectorId(id.into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for VectorId {
    fn from(id: String) -> Self {
        VectorId(id)
    }
}

impl From<&str> for VectorId {
    fn from(id: &str) -> Self {
        VectorId(id.to_string())
    }
}

impl std::fmt::Display for VectorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// VectorMetric
// ============================================================================

/// Distance metric for vector similarity search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorMetric {
    /// Cosine similarity (default).
    #[default]
    Cosine,
    /// Dot product.
    Dot,
    /// Euclidean (L2) distance.
    L2,
}

impl VectorMetric {
    /// Get the metric name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            VectorMetric::Cosine => "cosine",
            VectorMetric::Dot => "dot",
            VectorMetric::L2 => "l2",
        }
    }
}

impl std::fmt::Display for VectorMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// VectorInsert
// ============================================================================

/// A vector to insert or update in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorInsert {
    /// Unique identifier for this vector.
    pub id: VectorId,

    /// The embedding vector.
    pub vector: Vec<f32>,

    /// JSON payload with chunk metadata (text, ordinal, ...).
    pub payload: serde_json::Value,

    /// Source file path, relative to the repository root.
    #[serde(default)]
    pub path: Option<String>,

    /// Detected source language tag (e.g. "rust", "python").
    #[serde(default)]
    pub language: Option<String>,
}

impl VectorInsert {
    /// Create a new vector insert with required fields.
    pub fn new(id: impl Into<VectorId>, vector: Vec<f32>, payload: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            vector,
            payload,
            path: None,
            language: None,
        }
    }

    /// Set the source path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the language tag.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

// ============================================================================
// VectorSearchResult
// ============================================================================

/// A single result from a vector similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorSearchResult {
    /// Unique identifier of the matched vector.
    pub id: VectorId,

    /// Similarity score (higher is better for cosine/dot, lower for L2).
    pub score: f32,

    /// JSON payload associated with this vector.
    pub payload: serde_json::Value,

    /// The embedding vector (returned only when the query asks for it).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
}

impl VectorSearchResult {
    /// Create a new search result.
    pub fn new(id: impl Into<VectorId>, score: f32, payload: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            score,
            payload,
            vector: None,
        }
    }

    /// Set the vector.
    pub fn with_vector(mut self, vector: Vec<f32>) -> Self {
        self.vector = Some(vector);
        self
    }
}

// ============================================================================
// VectorIndexBackend Trait
// ============================================================================

/// Core trait for vector index backends.
///
/// This trait defines the interface that all vector storage backends must
/// implement: inserting, querying, and deleting vectors.
///
/// ## Implementation Notes
///
/// - Backends should be thread-safe (implement `Send + Sync`).
/// - The `query` method should return results sorted by relevance (best first).
/// - Upsert semantics: if a vector with the same ID exists, it is replaced.
pub trait VectorIndexBackend: Send + Sync + std::fmt::Debug {
    /// Query the index for similar vectors.
    ///
    /// # Arguments
    /// * `embedding` - The query vector.
    /// * `limit` - Maximum number of results to return.
    /// * `filter` - Optional filter criteria.
    /// * `include_vectors` - Whether to return the stored vectors with each
    ///   result. Diversity re-ranking needs the candidate vectors; plain
    ///   similarity search does not.
    ///
    /// # Returns
    /// A list of search results sorted by relevance (best first).
    fn query(
        &self,
        embedding: &[f32],
        limit: usize,
        filter: Option<&VectorSearchFilter>,
        include_vectors: bool,
    ) -> DbResult<Vec<VectorSearchResult>>;

    /// Insert or update vectors in the index.
    ///
    /// Uses upsert semantics: if a vector with the same ID exists, it is
    /// replaced.
    fn upsert(&self, vectors: &[VectorInsert]) -> DbResult<()>;

    /// Delete vectors by their IDs.
    fn delete(&self, ids: &[VectorId]) -> DbResult<()>;

    /// Delete all vectors belonging to a source path.
    ///
    /// Returns the number of vectors removed. Used when a file disappears
    /// from the repository between indexing runs.
    fn delete_by_path(&self, path: &str) -> DbResult<usize>;

    /// Flush pending writes to persistent storage.
    fn flush(&self) -> DbResult<()>;

    /// Get the number of vectors in the index.
    fn len(&self) -> DbResult<usize>;

    /// Get the number of distinct source paths in the index.
    fn distinct_paths(&self) -> DbResult<usize>;

    /// Check if the index is empty.
    fn is_empty(&self) -> DbResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Get the dimension of vectors in this index.
    fn dimension(&self) -> usize;

    /// Get the distance metric used by this index.
    fn metric(&self) -> VectorMetric;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_id() {
        let id = VectorId::new("abc123");
        assert_eq!(id.as_str(), "abc123");
        assert_eq!(id.to_string(), "abc123");

        let from_str: VectorId = "def456".into();
        assert_eq!(from_str.as_str(), "def456");
    }

    #[test]
    fn test_vector_metric() {
        assert_eq!(VectorMetric::Cosine.as_str(), "cosine");
        assert_eq!(VectorMetric::Dot.as_str(), "dot");
        assert_eq!(VectorMetric::L2.as_str(), "l2");
        assert_eq!(VectorMetric::default(), VectorMetric::Cosine);
    }

    #[test]
    fn test_vector_insert_builder() {
        let insert = VectorInsert::new(
            "chunk-1",
            vec![1.0, 2.0, 3.0],
            serde_json::json!({"text": "fn main() {}"}),
        )
        .with_path("src/main.rs")
        .with_language("rust");

        assert_eq!(insert.id.as_str(), "chunk-1");
        assert_eq!(insert.path, Some("src/main.rs".to_string()));
        assert_eq!(insert.language, Some("rust".to_string()));
    }

    #[test]
    fn test_vector_search_result() {
        let result = VectorSearchResult::new("chunk-1", 0.95, serde_json::json!({"text": "hello"}))
            .with_vector(vec![1.0, 2.0, 3.0]);

        assert_eq!(result.id.as_str(), "chunk-1");
        assert_eq!(result.score, 0.95);
        assert!(result.vector.is_some());
    }
}
