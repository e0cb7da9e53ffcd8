//! Flat file-based vector index backend.
//!
//! This backend stores vectors in a JSONL file and uses an exact linear scan
//! for search. At repository scale (tens of thousands of chunks) an exact
//! scan answers queries in milliseconds, and the JSONL file doubles as the
//! persistence format: the index is reloaded on open and rewritten on flush.

use super::super::config::VectorIndexConfig;
use super::super::metadata::VectorSearchFilter;
use super::super::traits::{
    VectorId, VectorIndexBackend, VectorInsert, VectorMetric, VectorSearchResult,
};
use crate::error::{DbError, DbResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::RwLock;
use tracing::{debug, trace};

/// Filename for the JSONL data file.
const DATA_FILENAME: &str = "vectors.jsonl";

/// A stored vector entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredVector {
    id: String,
    vector: Vec<f32>,
    payload: serde_json::Value,
    path: Option<String>,
    language: Option<String>,
}

impl From<&VectorInsert> for StoredVector {
    fn from(insert: &VectorInsert) -> Self {
        Self {
            id: insert.id.as_str().to_string(),
            vector: insert.vector.clone(),
            payload: insert.payload.clone(),
            path: insert.path.clone(),
            language: insert.language.clone(),
        }
    }
}

/// Flat file-based vector index.
///
/// Uses JSONL storage and exact linear scan for search.
#[derive(Debug)]
pub struct FlatVectorIndex {
    /// Path to the index directory.
    path: PathBuf,

    /// Dimension of vectors.
    dimension: usize,

    /// Distance metric.
    metric: VectorMetric,

    /// In-memory vector store, keyed by chunk id.
    vectors: RwLock<HashMap<String, StoredVector>>,
}

impl FlatVectorIndex {
    /// Open or create a flat vector index.
    pub fn open(config: &VectorIndexConfig) -> DbResult<Self> {
        debug!("Opening FlatVectorIndex at {:?}", config.path);

        let index = Self {
            path: config.path.clone(),
            dimension: config.dimension,
            metric: config.metric,
            vectors: RwLock::new(HashMap::new()),
        };

        // Load existing data if present
        let data_path = config.path.join(DATA_FILENAME);
        if data_path.exists() {
            index.load_from_file(&data_path)?;
        }

        Ok(index)
    }

    /// Load vectors from a JSONL file.
    fn load_from_file(&self, path: &PathBuf) -> DbResult<()> {
        debug!("Loading vectors from {:?}", path);

        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let mut vectors = self
            .vectors
            .write()
            .map_err(|e| DbError::internal(format!("Failed to acquire write lock: {}", e)))?;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<StoredVector>(&line) {
                Ok(stored) => {
                    vectors.insert(stored.id.clone(), stored);
                }
                Err(e) => {
                    debug!("Skipping invalid line {}: {}", line_num + 1, e);
                }
            }
        }

        debug!("Loaded {} vectors", vectors.len());
        Ok(())
    }

    /// Save all vectors to the JSONL file.
    fn save_to_file(&self) -> DbResult<()> {
        let data_path = self.path.join(DATA_FILENAME);
        debug!("Saving vectors to {:?}", data_path);

        let vectors = self
            .vectors
            .read()
            .map_err(|e| DbError::internal(format!("Failed to acquire read lock: {}", e)))?;

        let mut file = File::create(&data_path)?;
        for stored in vectors.values() {
            let line = serde_json::to_string(stored)?;
            writeln!(file, "{}", line)?;
        }

        debug!("Saved {} vectors", vectors.len());
        Ok(())
    }

    /// Check if a vector matches the filter.
    fn matches_filter(stored: &StoredVector, filter: &VectorSearchFilter) -> bool {
        if let Some(ref prefix) = filter.path_prefix {
            match &stored.path {
                Some(p) if p.starts_with(prefix.as_str()) => {}
                _ => return false,
            }
        }

        if let Some(ref language) = filter.language {
            match &stored.language {
                Some(l) if l == language => {}
                _ => return false,
            }
        }

        true
    }

    /// Compute similarity between two vectors.
    fn compute_similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        match self.metric {
            VectorMetric::Cosine => cosine_similarity(a, b),
            VectorMetric::Dot => dot_product(a, b),
            VectorMetric::L2 => -euclidean_distance(a, b), // Negate so higher is better
        }
    }
}

impl VectorIndexBackend for FlatVectorIndex {
    fn query(
        &self,
        embedding: &[f32],
        limit: usize,
        filter: Option<&VectorSearchFilter>,
        include_vectors: bool,
    ) -> DbResult<Vec<VectorSearchResult>> {
        trace!("Querying FlatVectorIndex, limit={}", limit);

        let vectors = self
            .vectors
            .read()
            .map_err(|e| DbError::internal(format!("Failed to acquire read lock: {}", e)))?;

        // Compute similarities
        let mut scored: Vec<(f32, &StoredVector)> = vectors
            .values()
            .filter(|v| filter.map(|f| Self::matches_filter(v, f)).unwrap_or(true))
            .map(|v| (self.compute_similarity(embedding, &v.vector), v))
            .collect();

        // Sort by score (descending)
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        // Take top results
        let results: Vec<VectorSearchResult> = scored
            .into_iter()
            .take(limit)
            .map(|(score, stored)| {
                let mut result = VectorSearchResult::new(
                    VectorId::new(stored.id.clone()),
                    score,
                    stored.payload.clone(),
                );
                if include_vectors {
                    result = result.with_vector(stored.vector.clone());
                }
                result
            })
            .collect();

        trace!("Found {} results", results.len());
        Ok(results)
    }

    fn upsert(&self, vectors: &[VectorInsert]) -> DbResult<()> {
        debug!("Upserting {} vectors", vectors.len());

        let mut stored = self
            .vectors
            .write()
            .map_err(|e| DbError::internal(format!("Failed to acquire write lock: {}", e)))?;

        for insert in vectors {
            // Validate dimension
            if insert.vector.len() != self.dimension {
                return Err(DbError::DimensionMismatch {
                    expected: self.dimension,
                    actual: insert.vector.len(),
                });
            }

            let entry = StoredVector::from(insert);
            stored.insert(entry.id.clone(), entry);
        }

        // Persist immediately
        drop(stored);
        self.save_to_file()?;

        Ok(())
    }

    fn delete(&self, ids: &[VectorId]) -> DbResult<()> {
        debug!("Deleting {} vectors", ids.len());

        let mut stored = self
            .vectors
            .write()
            .map_err(|e| DbError::internal(format!("Failed to acquire write lock: {}", e)))?;

        for id in ids {
            stored.remove(id.as_str());
        }

        // Persist immediately
        drop(stored);
        self.save_to_file()?;

        Ok(())
    }

    fn delete_by_path(&self, path: &str) -> DbResult<usize> {
        let mut stored = self
            .vectors
            .write()
            .map_err(|e| DbError::internal(format!("Failed to acquire write lock: {}", e)))?;

        let before = stored.len();
        stored.retain(|_, v| v.path.as_deref() != Some(path));
        let removed = before - stored.len();

        drop(stored);
        if removed > 0 {
            debug!("Deleted {} vectors for path {}", removed, path);
            self.save_to_file()?;
        }

        Ok(removed)
    }

    fn flush(&self) -> DbResult<()> {
        self.save_to_file()
    }

    fn len(&self) -> DbResult<usize> {
        let stored = self
            .vectors
            .read()
            .map_err(|e| DbError::internal(format!("Failed to acquire read lock: {}", e)))?;
        Ok(stored.len())
    }

    fn distinct_paths(&self) -> DbResult<usize> {
        let stored = self
            .vectors
            .read()
            .map_err(|e| DbError::internal(format!("Failed to acquire read lock: {}", e)))?;
        let paths: std::collections::HashSet<&str> = stored
            .values()
            .filter_map(|v| v.path.as_deref())
            .collect();
        Ok(paths.len())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn metric(&self) -> VectorMetric {
        self.metric
    }
}

// ============================================================================
// Similarity Functions
// ============================================================================

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Compute dot product between two vectors.
fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Compute Euclidean (L2) distance between two vectors.
fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}

// ============================================================================
// Tests
// ============================================================================
