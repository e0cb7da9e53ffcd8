//! Answer generation and response formatting.
//!
//! The ask pipeline combines retrieved chunks into a context block, asks the
//! chat model for a grounded answer, and formats the result as markdown with
//! cited sources. Retrieval-only searches share the same source formatting
//! under a "Results for" heading.
//!
//! Every ask is appended to `.cqs/logs/asks.jsonl` so index quality
//! regressions can be traced back to real queries.

use std::io::Write;

use chrono::{DateTime, Utc};
use cqs_llm::ChatBackend;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::errors::CqsError;
use crate::types::{AskResult, RetrievedChunk};
use crate::workspace::Workspace;

/// System prompt for grounded question answering.
const ANSWER_SYSTEM_PROMPT: &str = "You answer questions about a codebase. \
Use only the provided context. If the context does not contain the answer, \
say so. Be concise and reference file paths when relevant.";

// ============================================================================
// Ask Pipeline
// ============================================================================

/// Generate an answer for `question` grounded on `sources`.
pub fn run_answer(
    chat: &dyn ChatBackend,
    question: &str,
    sources: Vec<RetrievedChunk>,
    mmr: bool,
) -> Result<AskResult, CqsError> {
    let context = build_context(&sources);
    let user_prompt = format!(
        "{question}\n\nContext from the repository:\n\n{context}"
    );

    let answer = chat
        .complete(ANSWER_SYSTEM_PROMPT, &user_prompt)
        .map_err(|e| CqsError::AnswerError {
            question: question.to_string(),
            reason: e.to_string(),
        })?;

    Ok(AskResult {
        answer,
        sources,
        mmr,
    })
}

/// Concatenate chunk texts into the context block fed to the chat model.
fn build_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| format!("[{}]\n{}", chunk.path, chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

// ============================================================================
// Response Formatting
// ============================================================================

/// Format an answer (or a retrieval heading) with its source chunks as
/// markdown.
///
/// Layout: an `## Answer` section followed by `## Sources`, one subsection
/// per chunk with the file path and the chunk text in a language-tagged code
/// fence.
pub fn format_response(answer: &str, sources: &[RetrievedChunk]) -> String {
    let mut out = format!("## Answer\n\n{}\n\n## Sources\n\n", answer);

    for (i, chunk) in sources.iter().enumerate() {
        let filename = chunk
            .path
            .rsplit('/')
            .next()
            .unwrap_or(chunk.path.as_str());

        out.push_str(&format!("### Source {}: {}\n", i + 1, filename));
        out.push_str(&format!("**Path:** `{}`\n\n", chunk.path));
        out.push_str(&format!("```{}\n", chunk.language));
        out.push_str(chunk.text.trim_end());
        out.push_str("\n```\n\n");
    }

    out
}

/// Format retrieval-only results.
pub fn format_search_results(query: &str, sources: &[RetrievedChunk]) -> String {
    format_response(&format!("Results for: {}", query), sources)
}

// ============================================================================
// Ask Log
// ============================================================================

/// A single entry in the ask log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskLogEntry {
    /// Entry id.
    pub id: Uuid,

    /// The question or search query.
    pub query: String,

    /// "ask" or "search".
    pub mode: String,

    /// Whether diversity re-ranking was applied.
    pub mmr: bool,

    /// Paths of the returned chunks, best first.
    pub source_paths: Vec<String>,

    /// When the query ran.
    pub at: DateTime<Utc>,
}

impl AskLogEntry {
    /// Build a log entry from retrieval output.
    pub fn new(query: &str, mode: &str, mmr: bool, sources: &[RetrievedChunk]) -> Self {
        Self {
            id: Uuid::new_v4(),
            query: query.to_string(),
            mode: mode.to_string(),
            mmr,
            source_paths: sources.iter().map(|c| c.path.clone()).collect(),
            at: Utc::now(),
        }
    }
}

/// Append an entry to the ask log.
pub fn append_ask_log(workspace: &Workspace, entry: &AskLogEntry) -> Result<(), CqsError> {
    let path = workspace.ask_log_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| CqsError::LogIoError {
            path: path.clone(),
            reason: e.to_string(),
        })?;

    let line = serde_json::to_string(entry)?;
    writeln!(file, "{}", line).map_err(|e| CqsError::LogIoError {
        path,
        reason: e.to_string(),
    })?;

    debug!("Appended ask log entry {}", entry.id);
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use cqs_llm::MockChatBackend;

    fn chunk(path: &str, language: &str, text: &str) -> RetrievedChunk {
        RetrievedChunk {
            path: path.to_string(),
            ordinal: 0,
            language: language.to_string(),
            text: text.to_string(),
            score: 0.9,
        }
    }

    #[test]
    fn test_format_response_layout() {
        let sources = vec![
            chunk("src/db.rs", "rust", "fn connect() {}\n"),
            chunk("docs/setup.md", "markdown", "# Setup\n"),
        ];
        let out = format_response("The pool is created in connect().", &sources);

        assert!(out.starts_with("## Answer\n\nThe pool is created in connect()."));
        assert!(out.contains("## Sources"));
        assert!(out.contains("### Source 1: db.rs"));
        assert!(out.contains("**Path:** `src/db.rs`"));
        assert!(out.contains("```rust\nfn connect() {}\n```"));
        assert!(out.contains("### Source 2: setup.md"));
        assert!(out.contains("```markdown"));
    }

    #[test]
    fn test_format_search_results_heading() {
        let out = format_search_results("connection pool", &[]);
        assert!(out.contains("Results for: connection pool"));
    }

    #[test]
    fn test_run_answer_grounds_question() {
        let chat = MockChatBackend::new();
        let sources = vec![chunk("src/db.rs", "rust", "fn connect() {}")];

        let result = run_answer(&chat, "How is the pool created?", sources, false).unwrap();
        assert!(result.answer.contains("How is the pool created?"));
        assert_eq!(result.sources.len(), 1);
        assert!(!result.mmr);
    }

    #[test]
    fn test_ask_log_appends_jsonl() {
        let temp = tempfile::tempdir().unwrap();
        let workspace = Workspace::from_root(temp.path()).unwrap();

        let sources = vec![chunk("src/a.rs", "rust", "a")];
        append_ask_log(
            &workspace,
            &AskLogEntry::new("first", "ask", false, &sources),
        )
        .unwrap();
        append_ask_log(
            &workspace,
            &AskLogEntry::new("second", "search", true, &sources),
        )
        .unwrap();

        let content = std::fs::read_to_string(workspace.ask_log_path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: AskLogEntry = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.query, "first");
        assert_eq!(first.source_paths, vec!["src/a.rs"]);

        let second: AskLogEntry = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.mode, "search");
        assert!(second.mmr);
    }
}
