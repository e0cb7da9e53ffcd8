//! cqs engine - the core orchestrator for all cqs operations.
//!
//! [`CqsEngine`] is the main entry point: it owns the resolved
//! configuration, builds the inference backends, and wires the repository
//! watcher, indexer, retriever, answer generator, and evaluation harness
//! together for the CLI.

use std::path::Path;
use std::sync::Arc;

use cqs_db::vector::{open_vector_index, VectorIndexBackend, VectorIndexConfig};
use cqs_llm::{
    ChatBackend, EmbeddingBackend, HttpChatClient, HttpEmbeddingClient, MockChatBackend,
    MockEmbeddingBackend,
};
use tracing::{debug, info};

use crate::answer::{append_ask_log, run_answer, AskLogEntry};
use crate::config::Config;
use crate::errors::CqsError;
use crate::eval::{load_questions, run_eval, EvalReport};
use crate::indexer::run_index;
use crate::repo::RepoWatcher;
use crate::retriever::run_search;
use crate::state::IndexState;
use crate::status::{build_status, StatusReport};
use crate::types::{AskResult, IndexOptions, IndexResult, RetrievalOptions, RetrievedChunk};
use crate::workspace::Workspace;

// ============================================================================
// CqsEngine
// ============================================================================

/// The main engine for cqs operations.
///
/// # Construction
///
/// Use [`CqsEngine::new`] for CLI usage (backends are built from the config
/// on demand), or [`CqsEngine::with_backends`] to inject backends directly.
pub struct CqsEngine {
    /// Resolved configuration.
    config: Config,

    /// Injected embedding backend (tests); built from config when `None`.
    embedder: Option<Arc<dyn EmbeddingBackend>>,

    /// Injected chat backend (tests); built from config when `None`.
    chat: Option<Arc<dyn ChatBackend>>,
}

impl CqsEngine {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create an engine from a resolved configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            embedder: None,
            chat: None,
        }
    }

    /// Create an engine with injected inference backends.
    pub fn with_backends(
        config: Config,
        embedder: Arc<dyn EmbeddingBackend>,
        chat: Arc<dyn ChatBackend>,
    ) -> Self {
        Self {
            config,
            embedder: Some(embedder),
            chat: Some(chat),
        }
    }

    /// The engine's configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Backends
    // -------------------------------------------------------------------------

    /// Whether the deterministic mock backends were requested via
    /// `CQS_MOCK_LLM`. Integration tests rely on this to run without
    /// network access; it is never selected implicitly.
    fn mock_requested() -> bool {
        std::env::var("CQS_MOCK_LLM")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false)
    }

    fn embedder(&self) -> Result<Arc<dyn EmbeddingBackend>, CqsError> {
        if let Some(embedder) = &self.embedder {
            return Ok(embedder.clone());
        }
        if Self::mock_requested() {
            debug!("Using mock embedding backend (CQS_MOCK_LLM)");
            return Ok(Arc::new(MockEmbeddingBackend::new(self.config.dimension)));
        }
        let client = HttpEmbeddingClient::new(self.config.llm_config())?;
        Ok(Arc::new(client))
    }

    fn chat(&self) -> Result<Arc<dyn ChatBackend>, CqsError> {
        if let Some(chat) = &self.chat {
            return Ok(chat.clone());
        }
        if Self::mock_requested() {
            debug!("Using mock chat backend (CQS_MOCK_LLM)");
            return Ok(Arc::new(MockChatBackend::new()));
        }
        let client = HttpChatClient::new(self.config.llm_config())?;
        Ok(Arc::new(client))
    }

    // -------------------------------------------------------------------------
    // Workspace
    // -------------------------------------------------------------------------

    /// Resolve the workspace for the configured repository path.
    pub fn resolve_workspace(&self) -> Result<Workspace, CqsError> {
        Workspace::from_root(&self.config.repo_path)
    }

    /// Open the existing vector index for a workspace.
    ///
    /// Fails with [`CqsError::NotIndexed`] when no state file exists, and
    /// with an actionable mismatch error when the configured embedding model
    /// differs from the one the index was built with.
    fn open_index(
        &self,
        workspace: &Workspace,
    ) -> Result<(Arc<dyn VectorIndexBackend>, IndexState), CqsError> {
        let state =
            IndexState::load(&workspace.state_path())?.ok_or(CqsError::NotIndexed)?;
        state.check_model(&self.config.embedding_model, self.config.dimension)?;

        let index = open_vector_index(
            &VectorIndexConfig::new(self.config.dimension, workspace.index_dir())
                .with_create_if_missing(false),
        )?;
        Ok((index, state))
    }

    // -------------------------------------------------------------------------
    // Operations
    // -------------------------------------------------------------------------

    /// Run an indexing pass, cloning the repository first if needed.
    pub fn index(&self, options: &IndexOptions) -> Result<IndexResult, CqsError> {
        let watcher = RepoWatcher::open_or_clone(
            self.config.repo_url.as_deref(),
            &self.config.repo_path,
        )?;
        let workspace = self.resolve_workspace()?;
        let embedder = self.embedder()?;

        run_index(&workspace, &self.config, &watcher, embedder.as_ref(), options)
    }

    /// Similarity (or MMR) retrieval without answer generation.
    pub fn search(
        &self,
        query: &str,
        options: &RetrievalOptions,
    ) -> Result<Vec<RetrievedChunk>, CqsError> {
        let workspace = self.resolve_workspace()?;
        let (index, _) = self.open_index(&workspace)?;
        let embedder = self.embedder()?;

        let chunks = run_search(index.as_ref(), embedder.as_ref(), query, options)?;

        append_ask_log(
            &workspace,
            &AskLogEntry::new(query, "search", options.mmr, &chunks),
        )?;
        Ok(chunks)
    }

    /// Answer a question grounded on retrieved chunks.
    pub fn ask(
        &self,
        question: &str,
        options: &RetrievalOptions,
    ) -> Result<AskResult, CqsError> {
        let workspace = self.resolve_workspace()?;
        let (index, _) = self.open_index(&workspace)?;
        let embedder = self.embedder()?;
        let chat = self.chat()?;

        let chunks = run_search(index.as_ref(), embedder.as_ref(), question, options)?;
        info!("Answering with {} retrieved chunks", chunks.len());
        let result = run_answer(chat.as_ref(), question, chunks, options.mmr)?;

        append_ask_log(
            &workspace,
            &AskLogEntry::new(question, "ask", options.mmr, &result.sources),
        )?;
        Ok(result)
    }

    /// Status of the current index.
    pub fn status(&self) -> Result<StatusReport, CqsError> {
        let workspace = self.resolve_workspace()?;
        build_status(&workspace)
    }

    /// Score the pipeline against a question file.
    pub fn eval(
        &self,
        questions_path: &Path,
        options: &RetrievalOptions,
        include_answers: bool,
    ) -> Result<EvalReport, CqsError> {
        let workspace = self.resolve_workspace()?;
        let (index, _) = self.open_index(&workspace)?;
        let embedder = self.embedder()?;

        let questions = load_questions(questions_path)?;

        let chat = if include_answers {
            Some(self.chat()?)
        } else {
            None
        };

        run_eval(
            index.as_ref(),
            embedder.as_ref(),
            chat.as_deref(),
            &questions,
            options,
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
