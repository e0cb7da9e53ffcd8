//! # cqs-core
//!
//! **cqs** - retrieval-augmented code search, core engine library.
//!
//! This crate provides the domain logic for cqs: incremental indexing of a
//! git repository into a persisted vector index, similarity and
//! diversity-aware retrieval over that index, grounded answer generation,
//! and an offline evaluation harness. It is designed to be consumed by the
//! `cqs` CLI and other Rust tools.
//!
//! ## Main Types
//!
//! - [`CqsEngine`] - the main entry point for all cqs operations
//! - [`Workspace`] - a target repository and its `.cqs` data layout
//! - [`CqsError`] - domain-specific error type
//!
//! ## Pipeline
//!
//! ```text
//! write path: repo watcher -> loader/splitter -> embeddings -> vector index
//! read path:  query -> retriever (similarity | MMR) -> answer generator
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use cqs_core::{Config, CqsEngine, IndexOptions, RetrievalOptions};
//!
//! let config = Config::load()?;
//! let engine = CqsEngine::new(config);
//!
//! engine.index(&IndexOptions::default())?;
//! let answer = engine.ask("how does indexing work?", &RetrievalOptions::default())?;
//! println!("{}", answer.answer);
//! ```

// Modules
pub mod answer;
pub mod chunker;
pub mod config;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod eval;
pub mod indexer;
pub mod loader;
pub mod repo;
pub mod retriever;
pub mod state;
pub mod status;
pub mod types;
pub mod workspace;

// Re-exports for convenience
pub use answer::{
    append_ask_log, format_response, format_search_results, run_answer, AskLogEntry,
};
pub use chunker::TextChunker;
pub use config::{Config, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
pub use constants::{
    detect_language, is_text_extension, should_ignore_dir, ALWAYS_IGNORED_DIRS, CQS_DIR,
    MAX_FILE_SIZE_BYTES, STATE_FILENAME,
};
pub use engine::CqsEngine;
pub use errors::CqsError;
pub use eval::{load_questions, run_eval, EvalQuestion, EvalQuestionResult, EvalReport};
pub use indexer::{run_index, EMBEDDING_BATCH_SIZE};
pub use loader::{load_documents, Document, LoadSummary};
pub use repo::{ChangedFiles, RepoWatcher};
pub use retriever::run_search;
pub use state::IndexState;
pub use status::{build_status, StatusReport};
pub use types::{
    AskResult, ChunkId, IndexOptions, IndexResult, RetrievalOptions, RetrievedChunk,
    DEFAULT_FETCH_K, DEFAULT_MMR_LAMBDA, DEFAULT_TOP_K,
};
pub use workspace::Workspace;
