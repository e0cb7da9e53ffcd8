//! Offline evaluation of the retrieval(+answer) pipeline.
//!
//! Consumes a prepared question file (a JSON array of objects with at least
//! `question` and `source_path`; extra fields from the question-generation
//! tooling are ignored) and scores retrieval by whether the expected source
//! file appears in the top-k results:
//!
//! - hit@k: fraction of questions whose source file was retrieved
//! - MRR: mean reciprocal rank of the source file
//!
//! With `include_answers`, the RAG answer for each question is generated and
//! included in the report for manual inspection.

use std::path::Path;

use cqs_db::vector::VectorIndexBackend;
use cqs_llm::{ChatBackend, EmbeddingBackend};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::answer::run_answer;
use crate::errors::CqsError;
use crate::retriever::run_search;
use crate::types::RetrievalOptions;

// ============================================================================
// Question File
// ============================================================================

/// A question from the evaluation file.
#[derive(Debug, Clone, Deserialize)]
pub struct EvalQuestion {
    /// The question text.
    pub question: String,

    /// Path of the file the question was generated from.
    pub source_path: String,

    /// Reference answer, if the generator produced one.
    #[serde(default)]
    pub answer: Option<String>,
}

/// Load the question file.
pub fn load_questions(path: &Path) -> Result<Vec<EvalQuestion>, CqsError> {
    let content = std::fs::read_to_string(path).map_err(|e| CqsError::EvalQuestionsIo {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let questions: Vec<EvalQuestion> =
        serde_json::from_str(&content).map_err(|e| CqsError::EvalQuestionsParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    if questions.is_empty() {
        return Err(CqsError::EvalQuestionsEmpty {
            path: path.to_path_buf(),
        });
    }

    debug!("Loaded {} evaluation questions", questions.len());
    Ok(questions)
}

// ============================================================================
// Report
// ============================================================================

/// Per-question evaluation result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvalQuestionResult {
    /// The question text.
    pub question: String,

    /// The expected source path.
    pub source_path: String,

    /// Whether the source file appeared in the top-k results.
    pub hit: bool,

    /// 1-based rank of the source file, if retrieved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<usize>,

    /// Reciprocal rank (0.0 on a miss).
    pub reciprocal_rank: f64,

    /// Paths actually retrieved, best first.
    pub retrieved_paths: Vec<String>,

    /// Generated RAG answer (with `include_answers`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rag_answer: Option<String>,

    /// Reference answer from the question file, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_answer: Option<String>,
}

/// Aggregate evaluation report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvalReport {
    /// Number of questions evaluated.
    pub total: usize,

    /// Number of questions whose source file was retrieved.
    pub hits: usize,

    /// hit@k over all questions.
    pub hit_rate: f64,

    /// Mean reciprocal rank over all questions.
    pub mrr: f64,

    /// k used for retrieval.
    pub top_k: usize,

    /// Whether diversity re-ranking was applied.
    pub mmr: bool,

    /// Per-question results.
    pub questions: Vec<EvalQuestionResult>,
}

// ============================================================================
// Evaluation
// ============================================================================

/// Score the retrieval(+answer) pipeline against a question set.
pub fn run_eval(
    index: &dyn VectorIndexBackend,
    embedder: &dyn EmbeddingBackend,
    chat: Option<&dyn ChatBackend>,
    questions: &[EvalQuestion],
    options: &RetrievalOptions,
) -> Result<EvalReport, CqsError> {
    let mut results = Vec::with_capacity(questions.len());
    let mut hits = 0;
    let mut rr_sum = 0.0;

    for (i, question) in questions.iter().enumerate() {
        debug!(
            "Evaluating question {}/{}: {}",
            i + 1,
            questions.len(),
            question.question
        );

        let chunks = run_search(index, embedder, &question.question, options)?;
        let retrieved_paths: Vec<String> = chunks.iter().map(|c| c.path.clone()).collect();

        let rank = retrieved_paths
            .iter()
            .position(|p| paths_match(&question.source_path, p))
            .map(|pos| pos + 1);

        let reciprocal_rank = rank.map(|r| 1.0 / r as f64).unwrap_or(0.0);
        if rank.is_some() {
            hits += 1;
        }
        rr_sum += reciprocal_rank;

        let rag_answer = match chat {
            Some(chat) => Some(
                run_answer(chat, &question.question, chunks, options.mmr)?.answer,
            ),
            None => None,
        };

        results.push(EvalQuestionResult {
            question: question.question.clone(),
            source_path: question.source_path.clone(),
            hit: rank.is_some(),
            rank,
            reciprocal_rank,
            retrieved_paths,
            rag_answer,
            reference_answer: question.answer.clone(),
        });
    }

    let total = questions.len();
    let report = EvalReport {
        total,
        hits,
        hit_rate: hits as f64 / total as f64,
        mrr: rr_sum / total as f64,
        top_k: options.top_k,
        mmr: options.mmr,
        questions: results,
    };

    info!(
        "Evaluation: hit@{} {:.2}, MRR {:.3} over {} questions",
        report.top_k, report.hit_rate, report.mrr, report.total
    );
    Ok(report)
}

/// Compare an expected source path against a retrieved path.
///
/// The question file may carry absolute paths (the generator saw the repo at
/// some checkout location) while the index stores repo-relative paths, so a
/// suffix match on a path-component boundary counts.
fn paths_match(expected: &str, retrieved: &str) -> bool {
    let expected = expected.trim_start_matches("./");
    let retrieved = retrieved.trim_start_matches("./");

    if expected == retrieved {
        return true;
    }

    suffix_on_boundary(expected, retrieved) || suffix_on_boundary(retrieved, expected)
}

/// Whether `shorter` is a suffix of `longer` starting at a `/` boundary.
fn suffix_on_boundary(longer: &str, shorter: &str) -> bool {
    longer.ends_with(shorter)
        && longer.len() > shorter.len()
        && longer.as_bytes()[longer.len() - shorter.len() - 1] == b'/'
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use cqs_db::vector::{FlatVectorIndex, VectorIndexConfig, VectorInsert};
    use cqs_llm::{MockChatBackend, MockEmbeddingBackend};

    const DIM: usize = 32;

    fn seed_index(dir: &Path, embedder: &MockEmbeddingBackend) -> FlatVectorIndex {
        let index = FlatVectorIndex::open(&VectorIndexConfig::new(DIM, dir)).unwrap();
        let entries = [
            ("src/db.rs", "database connection pool setup"),
            ("src/ui.rs", "terminal progress bar rendering"),
        ];
        for (path, text) in entries {
            let vector = embedder.embed_one(text).unwrap();
            index
                .upsert(&[VectorInsert::new(
                    path,
                    vector,
                    serde_json::json!({"path": path, "ordinal": 0, "language": "rust", "text": text}),
                )
                .with_path(path)])
                .unwrap();
        }
        index
    }

    #[test]
    fn test_paths_match_variants() {
        assert!(paths_match("src/db.rs", "src/db.rs"));
        assert!(paths_match("/home/user/repo/src/db.rs", "src/db.rs"));
        assert!(paths_match("src/db.rs", "/checkout/src/db.rs"));
        assert!(paths_match("./src/db.rs", "src/db.rs"));
        assert!(!paths_match("b.rs", "db.rs"));
        assert!(!paths_match("src/db.rs", "src/ui.rs"));
    }

    #[test]
    fn test_eval_scores_hits_and_mrr() {
        let temp = tempfile::tempdir().unwrap();
        let embedder = MockEmbeddingBackend::new(DIM);
        let index = seed_index(temp.path(), &embedder);

        let questions = vec![
            EvalQuestion {
                question: "where is the database connection pool set up".to_string(),
                source_path: "src/db.rs".to_string(),
                answer: None,
            },
            EvalQuestion {
                question: "tokens with no overlap whatsoever".to_string(),
                source_path: "src/missing.rs".to_string(),
                answer: None,
            },
        ];

        let options = RetrievalOptions {
            top_k: 2,
            ..RetrievalOptions::default()
        };
        let report = run_eval(&index, &embedder, None, &questions, &options).unwrap();

        assert_eq!(report.total, 2);
        assert_eq!(report.hits, 1);
        assert!((report.hit_rate - 0.5).abs() < 1e-9);
        assert_eq!(report.questions[0].rank, Some(1));
        assert!((report.questions[0].reciprocal_rank - 1.0).abs() < 1e-9);
        assert!(!report.questions[1].hit);
        assert_eq!(report.questions[1].reciprocal_rank, 0.0);
        assert!((report.mrr - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_eval_with_answers() {
        let temp = tempfile::tempdir().unwrap();
        let embedder = MockEmbeddingBackend::new(DIM);
        let index = seed_index(temp.path(), &embedder);
        let chat = MockChatBackend::new();

        let questions = vec![EvalQuestion {
            question: "database pool?".to_string(),
            source_path: "src/db.rs".to_string(),
            answer: Some("reference".to_string()),
        }];

        let options = RetrievalOptions::default();
        let report =
            run_eval(&index, &embedder, Some(&chat), &questions, &options).unwrap();

        let q = &report.questions[0];
        assert!(q.rag_answer.as_deref().unwrap().contains("database pool?"));
        assert_eq!(q.reference_answer.as_deref(), Some("reference"));
    }

    #[test]
    fn test_load_questions_rejects_empty() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("q.json");
        std::fs::write(&path, "[]").unwrap();
        let err = load_questions(&path).unwrap_err();
        assert!(matches!(err, CqsError::EvalQuestionsEmpty { .. }));
    }

    #[test]
    fn test_load_questions_ignores_generator_fields() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("q.json");
        std::fs::write(
            &path,
            r#"[{"sample_id": 0, "question": "q?", "source_path": "a.rs", "context": [{"text": "x", "path": "a.rs"}]}]"#,
        )
        .unwrap();

        let questions = load_questions(&path).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].question, "q?");
        assert!(questions[0].answer.is_none());
    }
}
