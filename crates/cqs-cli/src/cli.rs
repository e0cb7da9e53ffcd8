//! CLI definition and command dispatch for cqs.
//!
//! This module defines the command-line interface using `clap` and provides
//! the `run()` function that dispatches commands to the engine.
//!
//! ## Configuration Precedence
//!
//! Configuration is resolved with the following precedence (highest to lowest):
//! 1. CLI flags (e.g., `--repo`, `--config`, `--verbose`)
//! 2. Environment variables (`GIT_REPO_URL`, `GIT_REPO_PATH`,
//!    `OPENAI_API_KEY`, `CQS_*`)
//! 3. Config file (`~/.cqs/config.yaml` or path from `--config`/`CQS_CONFIG`)
//! 4. Built-in defaults

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use cqs_core::{
    format_response, format_search_results, Config, CqsEngine, CqsError, IndexOptions,
    RetrievalOptions,
};

use crate::ui::{format, ColorMode, MessageType, Progress, ProgressMode, Style};

// ============================================================================
// CLI Definition
// ============================================================================

/// Version string including git commit hash
const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");

/// cqs - retrieval-augmented code search
#[derive(Parser, Debug)]
#[command(name = "cqs")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, env = "CQS_VERBOSE")]
    pub verbose: bool,

    /// Suppress progress and informational messages
    #[arg(short, long, global = true, env = "CQS_QUIET")]
    pub quiet: bool,

    /// Path of the repository to operate on (overrides GIT_REPO_PATH)
    #[arg(long, global = true)]
    pub repo: Option<PathBuf>,

    /// Path to configuration file (default: ~/.cqs/config.yaml)
    #[arg(long, global = true, env = "CQS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Color output mode: always, never, or auto (default: auto)
    #[arg(long, global = true, env = "CQS_COLOR", default_value = "auto")]
    pub color: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Retrieval flags shared by search, ask, and eval.
#[derive(clap::Args, Debug, Clone)]
pub struct RetrievalArgs {
    /// Number of results to return
    #[arg(short = 'k', long, default_value_t = cqs_core::DEFAULT_TOP_K)]
    pub top_k: usize,

    /// Use diversity-aware (MMR) re-ranking
    #[arg(long)]
    pub mmr: bool,

    /// Candidate pool size for MMR selection
    #[arg(long, default_value_t = cqs_core::DEFAULT_FETCH_K)]
    pub fetch_k: usize,

    /// Relevance/diversity balance for MMR (0-1, lower favors diversity)
    #[arg(long, default_value_t = cqs_core::DEFAULT_MMR_LAMBDA)]
    pub lambda: f32,

    /// Drop results scoring below this threshold
    #[arg(long)]
    pub min_score: Option<f32>,
}

impl RetrievalArgs {
    fn to_options(&self) -> RetrievalOptions {
        RetrievalOptions {
            top_k: self.top_k,
            mmr: self.mmr,
            fetch_k: self.fetch_k,
            lambda: self.lambda,
            min_score: self.min_score,
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Index the repository (incremental; only files changed since the last
    /// indexed commit are re-embedded)
    #[command(after_help = r#"EXAMPLES:
    # Incremental indexing of the current repository
    cqs index

    # Rebuild the whole index from scratch
    cqs index --all

    # Index a repository elsewhere on disk
    cqs --repo ../other-project index
"#)]
    Index {
        /// Re-index every tracked file instead of the incremental change set
        #[arg(long)]
        all: bool,

        /// Skip the remote fetch/fast-forward before diffing
        #[arg(long)]
        no_sync: bool,
    },

    /// Retrieve code chunks similar to a query (no answer generation)
    #[command(after_help = r#"EXAMPLES:
    # Top-5 similar chunks
    cqs search "function to load documents"

    # Diversity-aware selection from a larger candidate pool
    cqs search "error handling in the indexer" --mmr --fetch-k 30
"#)]
    Search {
        /// The search query
        query: String,

        #[command(flatten)]
        retrieval: RetrievalArgs,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Ask a natural-language question about the codebase
    #[command(after_help = r#"EXAMPLES:
    # Question answering with cited sources
    cqs ask "how does the document indexing work?"

    # Diversity-aware retrieval for broader context
    cqs ask "what config options exist?" --mmr
"#)]
    Ask {
        /// The question to answer
        question: String,

        #[command(flatten)]
        retrieval: RetrievalArgs,

        /// Output the answer and sources as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show current index status
    #[command(after_help = r#"EXAMPLES:
    # Show current status
    cqs status

    # Get status as JSON for scripting
    cqs status --json
"#)]
    Status {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Score retrieval (and optionally answers) against a question file
    #[command(after_help = r#"EXAMPLES:
    # Score retrieval hit-rate and MRR
    cqs eval data/evaluation_questions.json

    # Include generated answers and write the full report
    cqs eval data/evaluation_questions.json --answers -o report.json
"#)]
    Eval {
        /// Path to the question file (JSON array with question/source_path)
        questions: PathBuf,

        /// Generate RAG answers for each question
        #[arg(long)]
        answers: bool,

        #[command(flatten)]
        retrieval: RetrievalArgs,

        /// Write the full JSON report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the full report as JSON instead of the summary
        #[arg(long)]
        json: bool,
    },
}

// ============================================================================
// Dispatch
// ============================================================================

/// Parse arguments, set up logging, and dispatch to the engine.
///
/// Returns `ExitCode::SUCCESS` on success, or `ExitCode::FAILURE` on error.
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let color_mode = ColorMode::from_str(&cli.color).unwrap_or_default();
    let style = Style::new(color_mode);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", style.message(MessageType::Err, &e.to_string()));
            return ExitCode::FAILURE;
        }
    };

    let engine = CqsEngine::new(config);

    let result = match &cli.command {
        Command::Index { all, no_sync } => {
            handle_index(&style, &engine, color_mode, cli.quiet, *all, *no_sync)
        }
        Command::Search {
            query,
            retrieval,
            json,
        } => handle_search(&engine, query, &retrieval.to_options(), *json),
        Command::Ask {
            question,
            retrieval,
            json,
        } => handle_ask(&engine, question, &retrieval.to_options(), *json),
        Command::Status { json } => handle_status(&style, &engine, *json),
        Command::Eval {
            questions,
            answers,
            retrieval,
            output,
            json,
        } => handle_eval(
            &style,
            &engine,
            questions,
            *answers,
            &retrieval.to_options(),
            output.as_deref(),
            *json,
        ),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style.message(MessageType::Err, &e.to_string()));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config, CqsError> {
    let mut config = match &cli.config {
        Some(path) => Config::load_with_file(Some(path))?,
        None => Config::load()?,
    };

    if let Some(repo) = &cli.repo {
        config.repo_path = repo.clone();
    }

    Ok(config)
}

// ============================================================================
// Handlers
// ============================================================================

fn handle_index(
    style: &Style,
    engine: &CqsEngine,
    color_mode: ColorMode,
    quiet: bool,
    all: bool,
    no_sync: bool,
) -> Result<(), CqsError> {
    let mode = ProgressMode::detect(quiet, false, color_mode);
    let progress = Progress::spinner("Indexing repository...", mode);

    let result = engine.index(&IndexOptions { all, no_sync });
    progress.finish_and_clear();
    let result = result?;

    if result.is_noop() {
        println!(
            "{}",
            style.message(
                MessageType::Ok,
                &format!("Nothing to index at {}", result.commit_short),
            )
        );
        return Ok(());
    }

    println!(
        "{}",
        style.message(
            MessageType::Ok,
            &format!(
                "Indexed {} chunks from {} files at {}",
                result.chunks_indexed, result.indexed_files, result.commit_short
            ),
        )
    );

    if result.chunks_deleted > 0 {
        println!(
            "{}",
            style.message(
                MessageType::Info,
                &format!("Removed {} stale chunks", result.chunks_deleted),
            )
        );
    }

    if result.skipped_files > 0 {
        println!(
            "{}",
            style.dim(&format!("Skipped {} files", result.skipped_files))
        );
    }

    if result.failed_files > 0 {
        println!(
            "{}",
            style.message(
                MessageType::Warn,
                &format!(
                    "{} files failed to load (run with --verbose for details)",
                    result.failed_files
                ),
            )
        );
    }

    Ok(())
}

fn handle_search(
    engine: &CqsEngine,
    query: &str,
    options: &RetrievalOptions,
    json: bool,
) -> Result<(), CqsError> {
    let chunks = engine.search(query, options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&chunks)?);
    } else {
        print!("{}", format_search_results(query, &chunks));
    }

    Ok(())
}

fn handle_ask(
    engine: &CqsEngine,
    question: &str,
    options: &RetrievalOptions,
    json: bool,
) -> Result<(), CqsError> {
    let result = engine.ask(question, options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", format_response(&result.answer, &result.sources));
    }

    Ok(())
}

fn handle_status(style: &Style, engine: &CqsEngine, json: bool) -> Result<(), CqsError> {
    let report = engine.status()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", format::status_table(&report));

    if !report.indexed {
        println!(
            "{}",
            style.message(MessageType::Hint, "Run `cqs index` to build the index")
        );
    }

    Ok(())
}

fn handle_eval(
    style: &Style,
    engine: &CqsEngine,
    questions: &std::path::Path,
    answers: bool,
    options: &RetrievalOptions,
    output: Option<&std::path::Path>,
    json: bool,
) -> Result<(), CqsError> {
    let report = engine.eval(questions, options, answers)?;

    if let Some(output) = output {
        std::fs::write(output, serde_json::to_string_pretty(&report)?)?;
        println!(
            "{}",
            style.message(
                MessageType::Ok,
                &format!("Report written to {}", output.display()),
            )
        );
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{}",
        style.message(
            MessageType::Ok,
            &format!(
                "hit@{}: {:.2}  MRR: {:.3}  ({}/{} questions hit)",
                report.top_k, report.hit_rate, report.mrr, report.hits, report.total
            ),
        )
    );

    for question in report.questions.iter().filter(|q| !q.hit) {
        println!(
            "{}",
            style.dim(&format!(
                "miss: {} (expected {})",
                question.question, question.source_path
            ))
        );
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_retrieval_args_defaults() {
        let cli = Cli::try_parse_from(["cqs", "search", "query"]).unwrap();
        match cli.command {
            Command::Search { retrieval, .. } => {
                let options = retrieval.to_options();
                assert_eq!(options.top_k, 5);
                assert_eq!(options.fetch_k, 20);
                assert!(!options.mmr);
            }
            _ => panic!("expected search command"),
        }
    }

    #[test]
    fn test_mmr_flags_parse() {
        let cli = Cli::try_parse_from([
            "cqs", "ask", "why?", "--mmr", "--fetch-k", "30", "--lambda", "0.5",
        ])
        .unwrap();
        match cli.command {
            Command::Ask { retrieval, .. } => {
                assert!(retrieval.mmr);
                assert_eq!(retrieval.fetch_k, 30);
                assert!((retrieval.lambda - 0.5).abs() < f32::EPSILON);
            }
            _ => panic!("expected ask command"),
        }
    }
}
