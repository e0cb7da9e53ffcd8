//! Error types for cqs-llm.

use thiserror::Error;

/// Result type alias for cqs-llm operations.
pub type LlmResult<T> = Result<T, LlmError>;

/// Errors that can occur when talking to the embedding or chat APIs.
#[derive(Debug, Error)]
pub enum LlmError {
    /// No API key was configured.
    #[error("No API key configured. Set OPENAI_API_KEY.")]
    MissingApiKey,

    /// The API returned a non-success status.
    #[error("{endpoint} returned {status}: {body}")]
    Api {
        /// The endpoint that failed (e.g. "embeddings").
        endpoint: &'static str,
        /// HTTP status code.
        status: u16,
        /// Response body (truncated).
        body: String,
    },

    /// Rate limited and retries were exhausted.
    #[error("Rate limited by the API and retries exhausted")]
    RateLimited,

    /// The API returned a different number of embeddings than inputs.
    #[error("Embedding count mismatch: sent {sent} inputs, got {got} embeddings")]
    EmbeddingCountMismatch { sent: usize, got: usize },

    /// An embedding had an unexpected dimension.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}. Check CQS_VECTOR_DIMENSION against the model.")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The chat API returned no choices.
    #[error("Chat completion returned no choices")]
    EmptyResponse,

    /// Transport-level HTTP error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// Create an API error, truncating an overly long body.
    pub fn api(endpoint: &'static str, status: u16, body: String) -> Self {
        const MAX_BODY: usize = 500;
        let body = if body.len() > MAX_BODY {
            let mut end = MAX_BODY;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &body[..end])
        } else {
            body
        };
        Self::Api {
            endpoint,
            status,
            body,
        }
    }
}
