//! The indexing write path.
//!
//! `run_index` wires the pipeline together:
//!
//! 1. Load the persisted index state and decide the change set (full file
//!    set on first run or `--all`, otherwise the diff between the last
//!    indexed commit and HEAD).
//! 2. Load and split changed files.
//! 3. Embed chunk batches and upsert them into the vector index.
//! 4. Remove chunks of deleted files.
//! 5. Persist the new index state.
//!
//! The state file is written only after the index flush succeeds: a failed
//! run leaves the old state in place so the next run retries the same diff.

use std::collections::HashMap;

use cqs_db::vector::{open_vector_index, VectorIndexConfig, VectorInsert};
use cqs_llm::EmbeddingBackend;
use tracing::{debug, info, warn};

use crate::chunker::TextChunker;
use crate::config::Config;
use crate::errors::CqsError;
use crate::loader::load_documents;
use crate::repo::RepoWatcher;
use crate::state::IndexState;
use crate::types::{ChunkId, IndexOptions, IndexResult};
use crate::workspace::Workspace;

/// Number of chunks embedded per API round-trip.
pub const EMBEDDING_BATCH_SIZE: usize = 64;

/// A chunk prepared for embedding.
struct PendingChunk {
    id: ChunkId,
    path: String,
    ordinal: usize,
    language: String,
    text: String,
}

/// Run an indexing pass.
pub fn run_index(
    workspace: &Workspace,
    config: &Config,
    watcher: &RepoWatcher,
    embedder: &dyn EmbeddingBackend,
    options: &IndexOptions,
) -> Result<IndexResult, CqsError> {
    workspace.ensure_layout()?;

    let branch = watcher.default_branch()?;

    if !options.no_sync {
        if let Err(e) = watcher.sync(&branch) {
            warn!("Remote sync failed, indexing local state: {}", e);
        }
    }

    let state = IndexState::load(&workspace.state_path())?;
    let full_requested = options.all || config.all_files || state.is_none();

    if let Some(state) = &state {
        if !full_requested {
            // Incremental writes into an index built with a different model
            // would mix vector spaces.
            state.check_model(&config.embedding_model, config.dimension)?;
        }
    }

    let since = if full_requested {
        None
    } else {
        state.as_ref().map(|s| s.last_commit.as_str())
    };

    let changed = watcher.changed_files(since)?;
    let head = watcher.head_commit()?;

    // A full pass rebuilds the index from scratch so chunks of files that
    // vanished from tracking (or were embedded with an older model) do not
    // linger.
    if changed.full && workspace.index_dir().exists() {
        debug!("Full pass: clearing existing index");
        std::fs::remove_dir_all(workspace.index_dir())?;
    }

    let index = open_vector_index(
        &VectorIndexConfig::new(config.dimension, workspace.index_dir()),
    )?;

    if changed.is_empty() {
        info!("No changes since last indexed commit");
        let result = IndexResult {
            commit_short: short(&head),
            commit: head,
            indexed_files: 0,
            failed_files: 0,
            skipped_files: 0,
            chunks_indexed: 0,
            chunks_deleted: 0,
        };
        return Ok(result);
    }

    info!(
        "Found {} changed files ({} deleted)",
        changed.changed.len(),
        changed.deleted.len()
    );

    let (documents, summary) = load_documents(workspace.root(), &changed.changed);
    let chunker = TextChunker::new(config.chunk_size, config.chunk_overlap);

    // Ordinals run per path; CSV files produce several documents that share
    // one path.
    let mut ordinals: HashMap<String, usize> = HashMap::new();
    let mut pending = Vec::new();

    for document in &documents {
        let path = document.path.to_string_lossy().to_string();
        for text in chunker.split(&document.text) {
            let ordinal = ordinals.entry(path.clone()).or_insert(0);
            pending.push(PendingChunk {
                id: ChunkId::generate(&path, *ordinal, &text),
                path: path.clone(),
                ordinal: *ordinal,
                language: document.language.clone(),
                text,
            });
            *ordinal += 1;
        }
    }

    info!("Split {} files into {} chunks", summary.processed, pending.len());

    // On an incremental pass, drop the previous chunks of every re-indexed
    // file first: a changed file usually produces different chunk ids, and
    // stale tails would otherwise survive the upsert.
    let mut chunks_deleted = 0;
    if !changed.full {
        for path in ordinals.keys() {
            chunks_deleted += index.delete_by_path(path)?;
        }
    }
    for path in &changed.deleted {
        chunks_deleted += index.delete_by_path(&path.to_string_lossy())?;
    }

    // Embed and upsert in batches.
    let total_batches = pending.len().div_ceil(EMBEDDING_BATCH_SIZE);
    for (batch_index, batch) in pending.chunks(EMBEDDING_BATCH_SIZE).enumerate() {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder
            .embed_batch(&texts)
            .map_err(|e| CqsError::IndexEmbeddingError {
                reason: e.to_string(),
            })?;

        let inserts: Vec<VectorInsert> = batch
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| {
                VectorInsert::new(
                    chunk.id.as_str(),
                    vector,
                    serde_json::json!({
                        "path": chunk.path,
                        "ordinal": chunk.ordinal,
                        "language": chunk.language,
                        "text": chunk.text,
                    }),
                )
                .with_path(chunk.path.clone())
                .with_language(chunk.language.clone())
            })
            .collect();

        index.upsert(&inserts)?;
        debug!("Embedded batch {}/{}", batch_index + 1, total_batches);
    }

    index.flush()?;

    let new_state = IndexState {
        last_commit: head.clone(),
        branch,
        embedding_model: config.embedding_model.clone(),
        dimension: config.dimension,
        total_chunks: index.len()?,
        total_files: index.distinct_paths()?,
        indexed_at: chrono::Utc::now(),
        schema_version: 1,
    };
    new_state.save(&workspace.state_path())?;

    info!(
        "Indexed {} chunks from {} files at {}",
        pending.len(),
        summary.processed,
        short(&head)
    );

    Ok(IndexResult {
        commit_short: short(&head),
        commit: head,
        indexed_files: summary.processed,
        failed_files: summary.failed,
        skipped_files: summary.skipped,
        chunks_indexed: pending.len(),
        chunks_deleted,
    })
}

fn short(commit: &str) -> String {
    commit[..commit.len().min(8)].to_string()
}

// ============================================================================
// Tests
// ============================================================================
