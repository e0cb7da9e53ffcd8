//! Vector index backend implementations.
//!
//! ## Available Backends
//!
//! - `flat` (default): exact-scan JSONL-persisted index

mod flat;

pub use flat::FlatVectorIndex;

use super::config::{
    check_index_compatibility, write_index_meta, VectorIndexCompatibility, VectorIndexConfig,
    VectorIndexMeta,
};
use super::traits::VectorIndexBackend;
use crate::error::{DbError, DbResult};
use std::sync::Arc;
use tracing::{debug, info};

/// Open a vector index with the given configuration.
///
/// This is the main factory function for creating vector index instances.
/// It will:
/// 1. Check if an existing index is compatible
/// 2. Create a new index if needed (and `create_if_missing` is true)
/// 3. Open the appropriate backend
///
/// # Errors
///
/// Returns an error if:
/// - The index exists but is incompatible
/// - The backend is not supported
/// - The index cannot be created or opened
pub fn open_vector_index(config: &VectorIndexConfig) -> DbResult<Arc<dyn VectorIndexBackend>> {
    debug!("Opening vector index at {:?}", config.path);

    let compat = check_index_compatibility(config);

    match compat {
        VectorIndexCompatibility::Compatible => {
            debug!("Index is compatible, opening...");
        }
        VectorIndexCompatibility::NotFound => {
            if config.create_if_missing {
                info!("Index not found, creating new index at {:?}", config.path);
                std::fs::create_dir_all(&config.path)?;
                let meta = VectorIndexMeta::new(&config.backend, config.dimension, config.metric);
                write_index_meta(&config.path, &meta)?;
            } else {
                return Err(DbError::IndexNotFound {
                    path: config.path.clone(),
                });
            }
        }
        VectorIndexCompatibility::IncompatibleDimension { expected, actual } => {
            return Err(DbError::DimensionMismatch { expected, actual });
        }
        VectorIndexCompatibility::IncompatibleBackend { expected, actual } => {
            return Err(DbError::IndexIncompatible {
                reason: format!(
                    "Backend mismatch: expected '{}', found '{}'",
                    expected, actual
                ),
            });
        }
        VectorIndexCompatibility::IncompatibleMetric { expected, actual } => {
            return Err(DbError::IndexIncompatible {
                reason: format!(
                    "Metric mismatch: expected '{}', found '{}'",
                    expected, actual
                ),
            });
        }
        VectorIndexCompatibility::Corrupted(msg) => {
            return Err(DbError::IndexIncompatible {
                reason: format!("Index corrupted: {}", msg),
            });
        }
    }

    match config.backend.as_str() {
        "flat" => {
            let index = FlatVectorIndex::open(config)?;
            Ok(Arc::new(index))
        }

        backend => Err(DbError::Internal {
            message: format!(
                "Unknown backend: '{}'. Available backends: {}",
                backend,
                available_backends().join(", ")
            ),
        }),
    }
}

/// Get a list of available backend names.
pub fn available_backends() -> Vec<&'static str> {
    vec!["flat"]
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::traits::VectorInsert;

    #[test]
    fn test_open_creates_index_and_meta() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("index");
        let config = VectorIndexConfig::new(4, &path);

        let index = open_vector_index(&config).unwrap();
        assert_eq!(index.dimension(), 4);
        assert!(path.join(super::super::config::INDEX_META_FILENAME).exists());
    }

    #[test]
    fn test_open_missing_without_create_fails() {
        let temp = tempfile::tempdir().unwrap();
        let config = VectorIndexConfig::new(4, temp.path().join("missing"))
            .with_create_if_missing(false);

        let err = open_vector_index(&config).unwrap_err();
        assert!(matches!(err, DbError::IndexNotFound { .. }));
    }

    #[test]
    fn test_open_unknown_backend_fails() {
        let temp = tempfile::tempdir().unwrap();
        let config =
            VectorIndexConfig::new(4, temp.path().join("index")).with_backend("hnsw");

        let err = open_vector_index(&config).unwrap_err();
        assert!(err.to_string().contains("Unknown backend"));
    }

    #[test]
    fn test_reopen_with_wrong_dimension_fails() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("index");

        let config = VectorIndexConfig::new(4, &path);
        let index = open_vector_index(&config).unwrap();
        index
            .upsert(&[VectorInsert::new(
                "a",
                vec![1.0, 0.0, 0.0, 0.0],
                serde_json::json!({}),
            )])
            .unwrap();

        let wrong = VectorIndexConfig::new(8, &path);
        let err = open_vector_index(&wrong).unwrap_err();
        assert!(matches!(err, DbError::DimensionMismatch { .. }));
    }
}
