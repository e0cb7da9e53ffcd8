//! # cqs-db
//!
//! Storage layer for cqs - persisted vector index backends.
//!
//! This crate provides the vector-index implementations that are isolated
//! from the core domain logic in `cqs-core`. By separating these concerns:
//!
//! - Changes to `cqs-core` compile fast (no storage deps)
//! - Vector storage backends can be swapped without changing domain logic
//! - Testing is easier against the trait surface
//!
//! ## Architecture
//!
//! ```text
//! cqs-cli → cqs-core → (traits)
//!              ↑
//!           cqs-db  (implements traits for vector storage)
//!           cqs-llm (implements traits for embeddings/chat)
//! ```
//!
//! ## Backends
//!
//! - `flat` (default): exact nearest-neighbor scan over a JSONL-persisted
//!   store. The index is reloaded on open and flushed on write, so it
//!   survives across runs.
//!
//! ## Usage
//!
//! ```ignore
//! use cqs_db::vector::{VectorIndexConfig, open_vector_index};
//!
//! let config = VectorIndexConfig::new(1536, "/path/to/index");
//! let index = open_vector_index(&config)?;
//!
//! index.upsert(&inserts)?;
//! let results = index.query(&embedding, 10, None, false)?;
//! ```

pub mod error;
pub mod vector;

pub use error::{DbError, DbResult};
