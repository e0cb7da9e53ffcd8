//! Deterministic in-process backends for tests and offline smoke runs.
//!
//! The mock embedder hashes whitespace tokens into dimension buckets and
//! L2-normalizes the result, so texts sharing vocabulary land near each
//! other under cosine similarity. That is enough signal for retrieval tests
//! to assert "the chunk about X ranks above the chunk about Y" without any
//! network access.
//!
//! Mocks are only ever selected explicitly (`CQS_MOCK_LLM` or direct
//! construction); there is no silent fallback from the HTTP clients.

use crate::chat::ChatBackend;
use crate::embeddings::EmbeddingBackend;
use crate::error::LlmResult;

/// Deterministic token-hash embedder.
pub struct MockEmbeddingBackend {
    dimension: usize,
}

impl MockEmbeddingBackend {
    /// Create a mock embedder producing vectors of the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in text.split_whitespace() {
            let token = token.to_lowercase();
            // FNV-1a over the token bytes
            let mut hash: u64 = 0xcbf29ce484222325;
            for byte in token.bytes() {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(0x100000001b3);
            }
            let bucket = (hash % self.dimension as u64) as usize;
            vector[bucket] += 1.0;
        }

        // L2-normalize so cosine and dot agree
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }

        vector
    }
}

impl EmbeddingBackend for MockEmbeddingBackend {
    fn model_id(&self) -> &str {
        "mock-embedding"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_batch(&self, texts: &[String]) -> LlmResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// Canned chat backend: echoes a bounded slice of the question.
pub struct MockChatBackend;

impl MockChatBackend {
    /// Create a mock chat backend.
    pub fn new() -> Self {
        Self
    }
}

impl Default for MockChatBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatBackend for MockChatBackend {
    fn model_id(&self) -> &str {
        "mock-chat"
    }

    fn complete(&self, _system: &str, user: &str) -> LlmResult<String> {
        // First line of the user prompt, bounded, so tests can assert the
        // question flowed through the pipeline.
        let first_line = user.lines().next().unwrap_or_default();
        let mut end = first_line.len().min(120);
        while !first_line.is_char_boundary(end) {
            end -= 1;
        }
        Ok(format!("[mock answer] {}", &first_line[..end]))
    }
}

// ============================================================================
// Tests
// ============================================================================
