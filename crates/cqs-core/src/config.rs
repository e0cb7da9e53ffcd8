//! Configuration for cqs.
//!
//! Configuration is resolved with the following precedence (highest wins):
//!
//! 1. CLI flags (applied by the caller on top of the loaded config)
//! 2. Environment variables (`GIT_REPO_URL`, `GIT_REPO_PATH`,
//!    `OPENAI_API_KEY`, `OPENAI_BASE_URL`, `CQS_ALL_FILES`,
//!    `CQS_CHUNK_SIZE`, `CQS_CHUNK_OVERLAP`, `CQS_EMBEDDING_MODEL`,
//!    `CQS_VECTOR_DIMENSION`, `CQS_LLM_MODEL`)
//! 3. Config file (`~/.cqs/config.yaml`)
//! 4. Built-in defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{CQS_HOME_DIR, GLOBAL_CONFIG_FILENAME};
use crate::errors::CqsError;

/// Default chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default overlap between consecutive chunks in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

// ============================================================================
// Config
// ============================================================================

/// Resolved cqs configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Remote URL to clone the repository from when it is missing locally.
    pub repo_url: Option<String>,

    /// Local path of the repository to index.
    pub repo_path: PathBuf,

    /// Index every tracked file instead of the incremental changed set.
    pub all_files: bool,

    /// Chunk size in characters.
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters.
    pub chunk_overlap: usize,

    /// Embedding model identifier.
    pub embedding_model: String,

    /// Embedding vector dimension.
    pub dimension: usize,

    /// Chat model identifier.
    pub chat_model: String,

    /// API key for the embedding/chat endpoints. Never serialized.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repo_url: None,
            repo_path: PathBuf::from("."),
            all_files: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            embedding_model: cqs_llm::config::DEFAULT_EMBEDDING_MODEL.to_string(),
            dimension: cqs_llm::config::DEFAULT_DIMENSION,
            chat_model: cqs_llm::config::DEFAULT_CHAT_MODEL.to_string(),
            api_key: None,
            base_url: cqs_llm::config::DEFAULT_BASE_URL.to_string(),
        }
    }
}

// ============================================================================
// Config File
// ============================================================================

/// Partial configuration as stored in `~/.cqs/config.yaml`.
///
/// Every field is optional; unset fields fall through to defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ConfigFile {
    repo_url: Option<String>,
    repo_path: Option<PathBuf>,
    all_files: Option<bool>,
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
    embedding_model: Option<String>,
    dimension: Option<usize>,
    chat_model: Option<String>,
    base_url: Option<String>,
}

impl Config {
    /// Path of the default global config file (`~/.cqs/config.yaml`).
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CQS_HOME_DIR).join(GLOBAL_CONFIG_FILENAME))
    }

    /// Load configuration: defaults, then the config file (if present), then
    /// environment variables.
    pub fn load() -> Result<Self, CqsError> {
        Self::load_with_file(Self::default_config_path().as_deref())
    }

    /// Load configuration with an explicit config-file path.
    pub fn load_with_file(path: Option<&Path>) -> Result<Self, CqsError> {
        let mut config = Config::default();

        if let Some(path) = path {
            if path.exists() {
                debug!("Loading config file from {:?}", path);
                config.apply_file(path)?;
            }
        }

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), CqsError> {
        let content = std::fs::read_to_string(path)?;
        let file: ConfigFile =
            serde_yaml::from_str(&content).map_err(|e| CqsError::InvalidConfigFile {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        if let Some(repo_url) = file.repo_url {
            self.repo_url = Some(repo_url);
        }
        if let Some(repo_path) = file.repo_path {
            self.repo_path = repo_path;
        }
        if let Some(all_files) = file.all_files {
            self.all_files = all_files;
        }
        if let Some(chunk_size) = file.chunk_size {
            self.chunk_size = chunk_size;
        }
        if let Some(chunk_overlap) = file.chunk_overlap {
            self.chunk_overlap = chunk_overlap;
        }
        if let Some(embedding_model) = file.embedding_model {
            self.embedding_model = embedding_model;
        }
        if let Some(dimension) = file.dimension {
            self.dimension = dimension;
        }
        if let Some(chat_model) = file.chat_model {
            self.chat_model = chat_model;
        }
        if let Some(base_url) = file.base_url {
            self.base_url = base_url;
        }

        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("GIT_REPO_URL") {
            if !url.is_empty() {
                self.repo_url = Some(url);
            }
        }
        if let Ok(path) = std::env::var("GIT_REPO_PATH") {
            if !path.is_empty() {
                self.repo_path = PathBuf::from(path);
            }
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.is_empty() {
                self.api_key = Some(key);
            }
        }
        if let Ok(url) = std::env::var("OPENAI_BASE_URL") {
            if !url.is_empty() {
                self.base_url = url;
            }
        }
        if let Ok(all) = std::env::var("CQS_ALL_FILES") {
            self.all_files = matches!(all.to_lowercase().as_str(), "true" | "1" | "yes");
        }
        if let Some(size) = env_usize("CQS_CHUNK_SIZE") {
            self.chunk_size = size;
        }
        if let Some(overlap) = env_usize("CQS_CHUNK_OVERLAP") {
            self.chunk_overlap = overlap;
        }
        if let Ok(model) = std::env::var("CQS_EMBEDDING_MODEL") {
            if !model.is_empty() {
                self.embedding_model = model;
            }
        }
        if let Some(dimension) = env_usize("CQS_VECTOR_DIMENSION") {
            self.dimension = dimension;
        }
        if let Ok(model) = std::env::var("CQS_LLM_MODEL") {
            if !model.is_empty() {
                self.chat_model = model;
            }
        }
    }

    /// Validate the configuration, returning actionable errors.
    pub fn validate(&self) -> Result<(), CqsError> {
        if self.chunk_size == 0 {
            return Err(CqsError::InvalidConfiguration {
                message: "chunk_size must be greater than zero".to_string(),
                hint: "Set CQS_CHUNK_SIZE to a positive number (default 1000)".to_string(),
            });
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(CqsError::InvalidConfiguration {
                message: format!(
                    "chunk_overlap ({}) must be smaller than chunk_size ({})",
                    self.chunk_overlap, self.chunk_size
                ),
                hint: "Lower CQS_CHUNK_OVERLAP or raise CQS_CHUNK_SIZE".to_string(),
            });
        }
        if self.dimension == 0 {
            return Err(CqsError::InvalidConfiguration {
                message: "dimension must be greater than zero".to_string(),
                hint: "Set CQS_VECTOR_DIMENSION to match the embedding model (1536 for text-embedding-3-small)".to_string(),
            });
        }
        Ok(())
    }

    /// Build the inference-layer configuration from this config.
    pub fn llm_config(&self) -> cqs_llm::LlmConfig {
        let mut llm = cqs_llm::LlmConfig {
            api_key: self.api_key.clone(),
            embedding_model: self.embedding_model.clone(),
            chat_model: self.chat_model.clone(),
            dimension: self.dimension,
            ..cqs_llm::LlmConfig::default()
        };
        llm = llm.with_base_url(self.base_url.clone());
        llm
    }
}

fn env_usize(name: &str) -> Option<usize> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

// ============================================================================
// Tests
// ============================================================================
