//! Error types for cqs-core.

use std::path::PathBuf;

use thiserror::Error;

/// Domain-specific errors for cqs operations.
#[derive(Error, Debug)]
pub enum CqsError {
    /// The repository has not been indexed yet.
    #[error("Repository not indexed. Run `cqs index` first.")]
    NotIndexed,

    /// A configuration value is invalid.
    #[error("Invalid configuration: {message}. {hint}")]
    InvalidConfiguration {
        /// Description of the invalid configuration.
        message: String,
        /// Actionable hint on how to fix it.
        hint: String,
    },

    /// The global configuration file is invalid.
    #[error("Config file invalid at `{path}`: {message}")]
    InvalidConfigFile {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// A path or file was not found.
    #[error("Path not found: {0}")]
    PathNotFound(String),

    /// An invalid path was provided (e.g., disk root, system directory).
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    // =========================================================================
    // Repository Errors
    // =========================================================================
    /// The repository does not exist locally and no clone URL is configured.
    #[error("Repository not found at `{path}` and no GIT_REPO_URL configured to clone from.")]
    RepoMissing {
        /// The expected local path.
        path: PathBuf,
    },

    /// Cloning the repository failed.
    #[error("Failed to clone `{url}`: {reason}")]
    RepoClone {
        /// The remote URL.
        url: String,
        /// Description of the failure.
        reason: String,
    },

    /// Opening the local repository failed.
    #[error("Failed to open repository at `{path}`: {reason}")]
    RepoOpen {
        /// The local repository path.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// Branch detection failed (e.g. detached HEAD, empty repository).
    #[error("Failed to resolve branch: {0}")]
    BranchDetectionFailed(String),

    /// A diff between two commits failed.
    #[error("Failed to diff `{from}` against HEAD: {reason}")]
    RepoDiff {
        /// The base commit id.
        from: String,
        /// Description of the failure.
        reason: String,
    },

    // =========================================================================
    // Index Errors
    // =========================================================================
    /// The index was built with a different embedding model or dimension.
    #[error("Index was built with model `{index_model}` (dim {index_dimension}) but the active model is `{active_model}` (dim {active_dimension}). Run `cqs index --all` to rebuild.")]
    EmbeddingModelMismatch {
        /// The model recorded in the index state.
        index_model: String,
        /// Dimension recorded in the index state.
        index_dimension: usize,
        /// The currently configured model.
        active_model: String,
        /// The currently configured dimension.
        active_dimension: usize,
    },

    /// Index state I/O error.
    #[error("Index state I/O error at `{path}`: {message}")]
    StateIo {
        /// Path to the state file.
        path: PathBuf,
        /// Description of the I/O error.
        message: String,
    },

    /// Index state parse error.
    #[error("Index state parse error at `{path}`: {message}")]
    StateParse {
        /// Path to the state file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Failed to embed chunk batches during indexing.
    #[error("Failed to embed chunks: {reason}")]
    IndexEmbeddingError {
        /// Description of the failure.
        reason: String,
    },

    // =========================================================================
    // Ask / Search Errors
    // =========================================================================
    /// Failed to embed the query.
    #[error("Failed to embed query `{query}`: {reason}")]
    QueryEmbeddingError {
        /// The query that failed to embed.
        query: String,
        /// Description of the failure.
        reason: String,
    },

    /// Failed to search the vector index.
    #[error("Failed to search the index: {reason}")]
    SearchError {
        /// Description of the failure.
        reason: String,
    },

    /// The chat completion for an ask failed.
    #[error("Failed to answer `{question}`: {reason}")]
    AnswerError {
        /// The question that failed.
        question: String,
        /// Description of the failure.
        reason: String,
    },

    // =========================================================================
    // Eval Errors
    // =========================================================================
    /// The evaluation question file could not be read.
    #[error("Failed to read question file `{path}`: {message}")]
    EvalQuestionsIo {
        /// Path to the question file.
        path: PathBuf,
        /// Description of the I/O error.
        message: String,
    },

    /// The evaluation question file could not be parsed.
    #[error("Failed to parse question file `{path}`: {message}")]
    EvalQuestionsParse {
        /// Path to the question file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// The evaluation question file contains no questions.
    #[error("Question file `{path}` contains no questions.")]
    EvalQuestionsEmpty {
        /// Path to the question file.
        path: PathBuf,
    },

    // =========================================================================
    // Log Errors
    // =========================================================================
    /// An error occurred while reading or writing a log file.
    #[error("Log I/O error at {path}: {reason}")]
    LogIoError {
        /// The path to the log file.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    /// Storage-layer error.
    #[error("Index error: {0}")]
    Db(#[from] cqs_db::DbError),

    /// Inference-layer error.
    #[error("API error: {0}")]
    Llm(#[from] cqs_llm::LlmError),

    /// Git error.
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A wrapped generic error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
