//! Embedding client for OpenAI-compatible `/v1/embeddings` endpoints.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LlmConfig;
use crate::error::{LlmError, LlmResult};
use crate::retry::send_with_retry;

/// Maximum characters to send per text to the embedding API.
///
/// Embedding models have a bounded token context (8 192 tokens for the
/// text-embedding-3 family). Code tokenises at roughly 1 token per 2-3
/// chars, but dense content (JSON blobs, minified JS) can reach ~2.3
/// tokens/char, so the budget stays well under the context limit.
const MAX_EMBED_CHARS: usize = 3_000;

/// Number of texts sent per embeddings request.
const EMBED_BATCH_SIZE: usize = 64;

/// Truncate `text` to at most `MAX_EMBED_CHARS`, splitting on a UTF-8 char
/// boundary.
fn truncate_for_embedding(text: &str) -> &str {
    if text.len() <= MAX_EMBED_CHARS {
        return text;
    }
    let mut end = MAX_EMBED_CHARS;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

// ============================================================================
// EmbeddingBackend Trait
// ============================================================================

/// Trait for embedding backends.
///
/// Implementations generate vector embeddings for batches of texts.
pub trait EmbeddingBackend: Send + Sync {
    /// The model identifier this backend embeds with.
    fn model_id(&self) -> &str;

    /// Dimensionality of the produced vectors.
    fn dimension(&self) -> usize;

    /// Generate embeddings for a batch of texts.
    ///
    /// Returns exactly one vector per input, in input order.
    fn embed_batch(&self, texts: &[String]) -> LlmResult<Vec<Vec<f32>>>;

    /// Generate an embedding for a single text.
    fn embed_one(&self, text: &str) -> LlmResult<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()])?;
        vectors.pop().ok_or(LlmError::EmbeddingCountMismatch {
            sent: 1,
            got: 0,
        })
    }
}

// ============================================================================
// HTTP Client
// ============================================================================

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

/// Embedding client for an OpenAI-compatible API.
pub struct HttpEmbeddingClient {
    client: reqwest::blocking::Client,
    config: LlmConfig,
}

impl HttpEmbeddingClient {
    /// Create a new client from configuration.
    ///
    /// # Errors
    ///
    /// Fails if no API key is configured or the HTTP client cannot be built.
    pub fn new(config: LlmConfig) -> LlmResult<Self> {
        config.require_api_key()?;
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    fn embed_request(&self, texts: &[String]) -> LlmResult<Vec<Vec<f32>>> {
        let url = format!("{}/v1/embeddings", self.config.base_url);
        let api_key = self.config.require_api_key()?.to_string();
        let model = self.config.embedding_model.clone();

        let response = send_with_retry("embeddings", self.config.max_retries, || {
            self.client
                .post(&url)
                .bearer_auth(&api_key)
                .json(&EmbedRequest {
                    model: &model,
                    input: texts,
                })
                .send()
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            return Err(LlmError::api("embeddings", status, body));
        }

        let body: EmbedResponse = response.json()?;
        let vectors: Vec<Vec<f32>> = body.data.into_iter().map(|d| d.embedding).collect();

        if vectors.len() != texts.len() {
            return Err(LlmError::EmbeddingCountMismatch {
                sent: texts.len(),
                got: vectors.len(),
            });
        }
        for vector in &vectors {
            if vector.len() != self.config.dimension {
                return Err(LlmError::DimensionMismatch {
                    expected: self.config.dimension,
                    actual: vector.len(),
                });
            }
        }

        Ok(vectors)
    }
}

impl EmbeddingBackend for HttpEmbeddingClient {
    fn model_id(&self) -> &str {
        &self.config.embedding_model
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn embed_batch(&self, texts: &[String]) -> LlmResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let truncated: Vec<String> = texts
            .iter()
            .map(|t| truncate_for_embedding(t).to_string())
            .collect();

        let mut all_vectors = Vec::with_capacity(truncated.len());
        for batch in truncated.chunks(EMBED_BATCH_SIZE) {
            debug!("Embedding batch of {} texts", batch.len());
            all_vectors.extend(self.embed_request(batch)?);
        }

        Ok(all_vectors)
    }
}

// ============================================================================
// Tests
// ============================================================================
