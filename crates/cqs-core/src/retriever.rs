//! Retrieval over the vector index.
//!
//! Two modes:
//!
//! - plain similarity: embed the query, return the top-k chunks by score
//! - MMR (maximal marginal relevance): fetch a larger candidate pool with
//!   vectors, then greedily select chunks balancing relevance against
//!   redundancy with what is already selected
//!
//! MMR needs candidate vectors; if a backend does not return them the
//! retriever degrades to plain similarity with a warning rather than failing
//! the query.

use cqs_db::vector::{VectorIndexBackend, VectorSearchResult};
use cqs_llm::EmbeddingBackend;
use tracing::{debug, warn};

use crate::errors::CqsError;
use crate::types::{RetrievalOptions, RetrievedChunk};

/// Retrieve chunks for a query.
pub fn run_search(
    index: &dyn VectorIndexBackend,
    embedder: &dyn EmbeddingBackend,
    query: &str,
    options: &RetrievalOptions,
) -> Result<Vec<RetrievedChunk>, CqsError> {
    let query_vector =
        embedder
            .embed_one(query)
            .map_err(|e| CqsError::QueryEmbeddingError {
                query: query.to_string(),
                reason: e.to_string(),
            })?;

    let results = if options.mmr {
        mmr_search(index, &query_vector, options)?
    } else {
        index
            .query(&query_vector, options.top_k, None, false)
            .map_err(|e| CqsError::SearchError {
                reason: e.to_string(),
            })?
    };

    let mut chunks: Vec<RetrievedChunk> = results.iter().map(chunk_from_result).collect();

    if let Some(min_score) = options.min_score {
        chunks.retain(|c| c.score >= min_score);
    }

    debug!("Retrieved {} chunks for query", chunks.len());
    Ok(chunks)
}

/// Diversity-aware retrieval: fetch `fetch_k` candidates, select `top_k` by
/// maximal marginal relevance.
fn mmr_search(
    index: &dyn VectorIndexBackend,
    query_vector: &[f32],
    options: &RetrievalOptions,
) -> Result<Vec<VectorSearchResult>, CqsError> {
    let fetch_k = options.fetch_k.max(options.top_k);
    let candidates = index
        .query(query_vector, fetch_k, None, true)
        .map_err(|e| CqsError::SearchError {
            reason: e.to_string(),
        })?;

    if candidates.iter().any(|c| c.vector.is_none()) {
        warn!("Backend returned candidates without vectors; falling back to similarity search");
        return Ok(candidates.into_iter().take(options.top_k).collect());
    }

    let selected = mmr_select(
        query_vector,
        &candidates,
        options.top_k,
        options.lambda,
    );
    Ok(selected)
}

/// Greedy MMR selection over candidates that carry their vectors.
///
/// At each step picks the candidate maximizing
/// `lambda * sim(query, d) - (1 - lambda) * max_{s in selected} sim(d, s)`.
fn mmr_select(
    query_vector: &[f32],
    candidates: &[VectorSearchResult],
    k: usize,
    lambda: f32,
) -> Vec<VectorSearchResult> {
    let mut remaining: Vec<usize> = (0..candidates.len()).collect();
    let mut selected: Vec<usize> = Vec::new();

    while selected.len() < k && !remaining.is_empty() {
        let mut best_pos = 0;
        let mut best_score = f32::NEG_INFINITY;

        for (pos, &candidate_idx) in remaining.iter().enumerate() {
            let vector = candidates[candidate_idx]
                .vector
                .as_deref()
                .expect("mmr candidates carry vectors");

            let relevance = cosine_similarity(query_vector, vector);
            let redundancy = selected
                .iter()
                .map(|&s| {
                    let other = candidates[s]
                        .vector
                        .as_deref()
                        .expect("mmr candidates carry vectors");
                    cosine_similarity(vector, other)
                })
                .fold(f32::NEG_INFINITY, f32::max);
            let redundancy = if redundancy.is_finite() { redundancy } else { 0.0 };

            let score = lambda * relevance - (1.0 - lambda) * redundancy;
            if score > best_score {
                best_score = score;
                best_pos = pos;
            }
        }

        selected.push(remaining.swap_remove(best_pos));
    }

    selected
        .into_iter()
        .map(|idx| candidates[idx].clone())
        .collect()
}

/// Cosine similarity of two vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Rehydrate a retrieved chunk from a search result payload.
fn chunk_from_result(result: &VectorSearchResult) -> RetrievedChunk {
    let payload = &result.payload;
    RetrievedChunk {
        path: payload["path"].as_str().unwrap_or("unknown").to_string(),
        ordinal: payload["ordinal"].as_u64().unwrap_or(0) as usize,
        language: payload["language"].as_str().unwrap_or("text").to_string(),
        text: payload["text"].as_str().unwrap_or_default().to_string(),
        score: result.score,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use cqs_db::vector::{FlatVectorIndex, VectorIndexConfig, VectorInsert};
    use cqs_llm::MockEmbeddingBackend;

    fn result(id: &str, score: f32, vector: Vec<f32>) -> VectorSearchResult {
        VectorSearchResult::new(id, score, serde_json::json!({"text": id}))
            .with_vector(vector)
    }

    #[test]
    fn test_mmr_prefers_diverse_over_duplicate() {
        // q = x-axis; a and b are identical high-relevance candidates,
        // c is moderately relevant but diverse.
        let query = vec![1.0, 0.0, 0.0];
        let candidates = vec![
            result("a", 0.95, vec![0.95, 0.312, 0.0]),
            result("b", 0.95, vec![0.95, 0.312, 0.0]),
            result("c", 0.85, vec![0.85, 0.0, 0.527]),
        ];

        let selected = mmr_select(&query, &candidates, 2, 0.5);
        let ids: Vec<&str> = selected.iter().map(|r| r.id.as_str()).collect();

        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], "a");
        assert_eq!(ids[1], "c", "duplicate b should lose to diverse c");
    }

    #[test]
    fn test_mmr_lambda_one_is_pure_relevance() {
        let query = vec![1.0, 0.0, 0.0];
        let candidates = vec![
            result("a", 0.95, vec![0.95, 0.312, 0.0]),
            result("b", 0.95, vec![0.95, 0.312, 0.0]),
            result("c", 0.85, vec![0.85, 0.0, 0.527]),
        ];

        let selected = mmr_select(&query, &candidates, 2, 1.0);
        let ids: Vec<&str> = selected.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_mmr_handles_fewer_candidates_than_k() {
        let query = vec![1.0, 0.0];
        let candidates = vec![result("a", 1.0, vec![1.0, 0.0])];
        let selected = mmr_select(&query, &candidates, 5, 0.8);
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn test_similarity_search_end_to_end() {
        let temp = tempfile::tempdir().unwrap();
        let embedder = MockEmbeddingBackend::new(32);
        let index =
            FlatVectorIndex::open(&VectorIndexConfig::new(32, temp.path())).unwrap();

        let texts = [
            ("db", "database connection pool setup and teardown"),
            ("ui", "terminal progress bar rendering"),
            ("net", "http client retry with exponential backoff"),
        ];
        for (id, text) in &texts {
            let vector = embedder.embed_one(text).unwrap();
            index
                .upsert(&[VectorInsert::new(
                    *id,
                    vector,
                    serde_json::json!({
                        "path": format!("src/{id}.rs"),
                        "ordinal": 0,
                        "language": "rust",
                        "text": text,
                    }),
                )
                .with_path(format!("src/{id}.rs"))])
                .unwrap();
        }

        let options = RetrievalOptions {
            top_k: 2,
            ..RetrievalOptions::default()
        };
        let chunks = run_search(
            &index,
            &embedder,
            "how is the database connection pool created",
            &options,
        )
        .unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].path, "src/db.rs");
        assert!(chunks[0].score >= chunks[1].score);
    }

    #[test]
    fn test_min_score_filters_results() {
        let temp = tempfile::tempdir().unwrap();
        let embedder = MockEmbeddingBackend::new(32);
        let index =
            FlatVectorIndex::open(&VectorIndexConfig::new(32, temp.path())).unwrap();

        let vector = embedder.embed_one("something entirely unrelated").unwrap();
        index
            .upsert(&[VectorInsert::new(
                "x",
                vector,
                serde_json::json!({"path": "x.rs", "ordinal": 0, "language": "rust", "text": "something entirely unrelated"}),
            )])
            .unwrap();

        let options = RetrievalOptions {
            top_k: 5,
            min_score: Some(0.99),
            ..RetrievalOptions::default()
        };
        let chunks = run_search(&index, &embedder, "completely different words", &options).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_mmr_end_to_end_returns_k() {
        let temp = tempfile::tempdir().unwrap();
        let embedder = MockEmbeddingBackend::new(32);
        let index =
            FlatVectorIndex::open(&VectorIndexConfig::new(32, temp.path())).unwrap();

        for i in 0..10 {
            let text = format!("helper function number {i} for parsing input");
            let vector = embedder.embed_one(&text).unwrap();
            index
                .upsert(&[VectorInsert::new(
                    format!("c{i}"),
                    vector,
                    serde_json::json!({"path": format!("src/f{i}.rs"), "ordinal": 0, "language": "rust", "text": text}),
                )])
                .unwrap();
        }

        let options = RetrievalOptions {
            top_k: 3,
            mmr: true,
            ..RetrievalOptions::default()
        };
        let chunks = run_search(&index, &embedder, "parsing input helper", &options).unwrap();
        assert_eq!(chunks.len(), 3);
    }
}
