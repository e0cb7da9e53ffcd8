//! # cqs CLI
//!
//! Command-line interface for cqs, the retrieval-augmented code-search tool.
//!
//! This binary provides human-friendly access to `cqs-core` functionality.
//! Run `cqs --help` for usage information.

mod cli;
pub mod ui;

use std::process::ExitCode;

fn main() -> ExitCode {
    cli::run()
}
