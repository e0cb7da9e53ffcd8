//! Client configuration for the embedding and chat APIs.

use serde::{Deserialize, Serialize};

/// Default API base URL (OpenAI).
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Default chat model.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o";

/// Default embedding dimension for text-embedding-3-small.
pub const DEFAULT_DIMENSION: usize = 1536;

/// Default number of retries on rate-limit responses.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for the embedding and chat clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmConfig {
    /// API key (Bearer token). Never logged.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,

    /// Embedding model identifier.
    pub embedding_model: String,

    /// Chat model identifier.
    pub chat_model: String,

    /// Expected embedding dimension.
    pub dimension: usize,

    /// Maximum retries on 429 responses.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            dimension: DEFAULT_DIMENSION,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl LlmConfig {
    /// Create a config with the required fields.
    pub fn new(
        api_key: impl Into<String>,
        embedding_model: impl Into<String>,
        chat_model: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self {
            api_key: Some(api_key.into()),
            embedding_model: embedding_model.into(),
            chat_model: chat_model.into(),
            dimension,
            ..Self::default()
        }
    }

    /// Set the base URL, trimming any trailing slashes.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut url = base_url.into();
        while url.ends_with('/') {
            url.pop();
        }
        self.base_url = url;
        self
    }

    /// Set the maximum number of rate-limit retries.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Get the API key or fail.
    pub fn require_api_key(&self) -> Result<&str, crate::error::LlmError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(crate::error::LlmError::MissingApiKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LlmConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.embedding_model, DEFAULT_EMBEDDING_MODEL);
        assert_eq!(config.dimension, DEFAULT_DIMENSION);
        assert!(config.require_api_key().is_err());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = LlmConfig::default().with_base_url("http://localhost:8080///");
        assert_eq!(config.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_api_key_never_serialized() {
        let config = LlmConfig::new("sk-secret", "embed", "chat", 8);
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-secret"));
    }
}
