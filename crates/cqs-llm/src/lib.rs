//! # cqs-llm
//!
//! Inference layer for cqs - embedding and chat-completion API clients.
//!
//! This crate isolates all remote-model access behind two small traits so
//! that `cqs-core` never touches HTTP directly:
//!
//! - [`EmbeddingBackend`] - batch text embedding
//! - [`ChatBackend`] - single-turn chat completion
//!
//! The shipped implementations talk to OpenAI-compatible endpoints
//! (`/v1/embeddings`, `/v1/chat/completions`) over a blocking reqwest
//! client. Deterministic in-process backends live in [`mock`] for tests and
//! offline smoke runs; they are selected explicitly, never as a silent
//! fallback.
//!
//! ## Usage
//!
//! ```ignore
//! use cqs_llm::{LlmConfig, HttpEmbeddingClient, EmbeddingBackend};
//!
//! let config = LlmConfig::new("sk-...", "text-embedding-3-small", "gpt-4o", 1536);
//! let client = HttpEmbeddingClient::new(config)?;
//! let vectors = client.embed_batch(&["fn main() {}".to_string()])?;
//! ```

pub mod chat;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod mock;
mod retry;

pub use chat::{ChatBackend, HttpChatClient};
pub use config::LlmConfig;
pub use embeddings::{EmbeddingBackend, HttpEmbeddingClient};
pub use error::{LlmError, LlmResult};
pub use mock::{MockChatBackend, MockEmbeddingBackend};
