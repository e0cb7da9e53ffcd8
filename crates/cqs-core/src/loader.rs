//! Extension-specific document loading.
//!
//! Each changed file is turned into one or more [`Document`]s according to
//! its extension:
//!
//! - code/config/text extensions: read as UTF-8 text
//! - `.csv`: one document per record, `column: value` lines
//! - `.ipynb`: notebook cells concatenated, outputs truncated
//! - anything else (including PDFs, which need an extraction toolchain this
//!   tool does not carry): skipped
//!
//! Load failures are counted, logged, and never fatal: a repository with one
//! unreadable file still indexes the rest.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::constants::{detect_language, is_text_extension, MAX_FILE_SIZE_BYTES};

/// Maximum characters kept per notebook cell output.
const NOTEBOOK_MAX_OUTPUT_LEN: usize = 20;

// ============================================================================
// Document
// ============================================================================

/// A loaded document ready for chunking.
#[derive(Debug, Clone)]
pub struct Document {
    /// Source file path, relative to the repository root.
    pub path: PathBuf,

    /// The document text.
    pub text: String,

    /// Detected language tag.
    pub language: String,
}

/// Counters for a load pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Files successfully loaded.
    pub processed: usize,

    /// Files that failed to load (I/O, encoding, parse errors).
    pub failed: usize,

    /// Files skipped (unknown extension, too large, missing).
    pub skipped: usize,
}

// ============================================================================
// Loading
// ============================================================================

/// Load documents for the given relative paths under `root`.
pub fn load_documents(root: &Path, files: &[PathBuf]) -> (Vec<Document>, LoadSummary) {
    let mut documents = Vec::new();
    let mut summary = LoadSummary::default();

    for rel in files {
        let abs = root.join(rel);

        if !abs.is_file() {
            debug!("File {} does not exist, skipping", rel.display());
            summary.skipped += 1;
            continue;
        }

        if let Ok(meta) = std::fs::metadata(&abs) {
            if meta.len() > MAX_FILE_SIZE_BYTES {
                debug!(
                    "File {} is {} bytes, over the size cap; skipping",
                    rel.display(),
                    meta.len()
                );
                summary.skipped += 1;
                continue;
            }
        }

        let ext = rel
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let loaded = if is_text_extension(&ext) {
            load_text(&abs, rel, &ext).map(|d| vec![d])
        } else if ext == "csv" {
            load_csv(&abs, rel)
        } else if ext == "ipynb" {
            load_notebook(&abs, rel).map(|d| vec![d])
        } else {
            debug!("Unknown file type .{}, skipping {}", ext, rel.display());
            summary.skipped += 1;
            continue;
        };

        match loaded {
            Ok(docs) => {
                summary.processed += 1;
                documents.extend(docs);
            }
            Err(e) => {
                warn!("Error loading {}: {}", rel.display(), e);
                summary.failed += 1;
            }
        }
    }

    debug!(
        "Loaded {} files, failed {} files, skipped {} files",
        summary.processed, summary.failed, summary.skipped
    );

    (documents, summary)
}

fn load_text(abs: &Path, rel: &Path, ext: &str) -> anyhow::Result<Document> {
    let text = std::fs::read_to_string(abs)?;
    Ok(Document {
        path: rel.to_path_buf(),
        text,
        language: detect_language(ext).to_string(),
    })
}

/// Row-wise CSV loader: one document per record, `column: value` per line.
fn load_csv(abs: &Path, rel: &Path) -> anyhow::Result<Vec<Document>> {
    let mut reader = csv::Reader::from_path(abs)?;
    let headers = reader.headers()?.clone();

    let mut documents = Vec::new();
    for record in reader.records() {
        let record = record?;
        let text = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| format!("{}: {}", header, value))
            .collect::<Vec<_>>()
            .join("\n");

        documents.push(Document {
            path: rel.to_path_buf(),
            text,
            language: "text".to_string(),
        });
    }

    Ok(documents)
}

// ============================================================================
// Notebook Loader
// ============================================================================

/// Subset of the .ipynb schema we care about.
#[derive(Deserialize)]
struct Notebook {
    #[serde(default)]
    cells: Vec<NotebookCell>,
}

#[derive(Deserialize)]
struct NotebookCell {
    cell_type: String,
    #[serde(default)]
    source: SourceLines,
    #[serde(default)]
    outputs: Vec<NotebookOutput>,
}

/// Notebook `source` fields may be a single string or a list of lines.
#[derive(Deserialize, Default)]
#[serde(untagged)]
enum SourceLines {
    #[default]
    Empty,
    One(String),
    Many(Vec<String>),
}

impl SourceLines {
    fn join(&self) -> String {
        match self {
            SourceLines::Empty => String::new(),
            SourceLines::One(s) => s.clone(),
            SourceLines::Many(lines) => lines.concat(),
        }
    }
}

#[derive(Deserialize)]
struct NotebookOutput {
    #[serde(default)]
    text: Option<SourceLines>,
    #[serde(default)]
    data: Option<serde_json::Map<String, serde_json::Value>>,
}

impl NotebookOutput {
    fn render(&self) -> Option<String> {
        if let Some(text) = &self.text {
            return Some(text.join());
        }
        if let Some(data) = &self.data {
            if let Some(serde_json::Value::String(s)) = data.get("text/plain") {
                return Some(s.clone());
            }
            if let Some(serde_json::Value::Array(lines)) = data.get("text/plain") {
                let joined: String = lines
                    .iter()
                    .filter_map(|v| v.as_str())
                    .collect();
                return Some(joined);
            }
        }
        None
    }
}

/// Truncate an output to the per-output budget at a char boundary.
fn truncate_output(output: &str) -> &str {
    if output.len() <= NOTEBOOK_MAX_OUTPUT_LEN {
        return output;
    }
    let mut end = NOTEBOOK_MAX_OUTPUT_LEN;
    while !output.is_char_boundary(end) {
        end -= 1;
    }
    &output[..end]
}

fn load_notebook(abs: &Path, rel: &Path) -> anyhow::Result<Document> {
    let raw = std::fs::read_to_string(abs)?;
    let notebook: Notebook = serde_json::from_str(&raw)?;

    let mut text = String::new();
    for cell in &notebook.cells {
        let source = cell.source.join();
        if source.trim().is_empty() {
            continue;
        }

        match cell.cell_type.as_str() {
            "markdown" => {
                text.push_str(&source);
                text.push_str("\n\n");
            }
            "code" => {
                text.push_str(&source);
                text.push('\n');
                for output in &cell.outputs {
                    if let Some(rendered) = output.render() {
                        text.push_str("# output: ");
                        text.push_str(truncate_output(&rendered));
                        text.push('\n');
                    }
                }
                text.push('\n');
            }
            _ => {}
        }
    }

    Ok(Document {
        path: rel.to_path_buf(),
        text,
        language: "python".to_string(),
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
        PathBuf::from(rel)
    }

    #[test]
    fn test_load_text_file() {
        let temp = tempfile::tempdir().unwrap();
        let rel = write(temp.path(), "src/main.rs", "fn main() {}\n");

        let (docs, summary) = load_documents(temp.path(), &[rel]);
        assert_eq!(summary.processed, 1);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].language, "rust");
        assert_eq!(docs[0].text, "fn main() {}\n");
    }

    #[test]
    fn test_missing_file_skipped() {
        let temp = tempfile::tempdir().unwrap();
        let (docs, summary) =
            load_documents(temp.path(), &[PathBuf::from("gone.rs")]);
        assert!(docs.is_empty());
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn test_unknown_extension_skipped() {
        let temp = tempfile::tempdir().unwrap();
        let rel = write(temp.path(), "logo.png", "not really a png");

        let (docs, summary) = load_documents(temp.path(), &[rel]);
        assert!(docs.is_empty());
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn test_oversized_file_skipped() {
        let temp = tempfile::tempdir().unwrap();
        let big = "x".repeat((MAX_FILE_SIZE_BYTES + 1) as usize);
        let rel = write(temp.path(), "big.txt", &big);

        let (_, summary) = load_documents(temp.path(), &[rel]);
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn test_non_utf8_counts_as_failed() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("bad.rs");
        fs::write(&path, [0xff, 0xfe, 0x00, 0x61]).unwrap();

        let (docs, summary) = load_documents(temp.path(), &[PathBuf::from("bad.rs")]);
        assert!(docs.is_empty());
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn test_csv_yields_document_per_record() {
        let temp = tempfile::tempdir().unwrap();
        let rel = write(
            temp.path(),
            "data.csv",
            "name,role\nalice,admin\nbob,viewer\n",
        );

        let (docs, summary) = load_documents(temp.path(), &[rel]);
        assert_eq!(summary.processed, 1);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].text, "name: alice\nrole: admin");
        assert_eq!(docs[1].text, "name: bob\nrole: viewer");
    }

    #[test]
    fn test_notebook_cells_and_outputs() {
        let temp = tempfile::tempdir().unwrap();
        let notebook = serde_json::json!({
            "cells": [
                {"cell_type": "markdown", "source": ["# Title\n"], "outputs": []},
                {
                    "cell_type": "code",
                    "source": ["print('hi')"],
                    "outputs": [{"text": ["hi, this output is longer than the budget"]}]
                }
            ]
        });
        let rel = write(temp.path(), "nb.ipynb", &notebook.to_string());

        let (docs, summary) = load_documents(temp.path(), &[rel]);
        assert_eq!(summary.processed, 1);
        assert_eq!(docs.len(), 1);

        let text = &docs[0].text;
        assert!(text.contains("# Title"));
        assert!(text.contains("print('hi')"));
        assert!(text.contains("# output: hi, this output is l"));
        // Truncated at the budget
        assert!(!text.contains("longer than the budget"));
    }

    #[test]
    fn test_invalid_notebook_counts_as_failed() {
        let temp = tempfile::tempdir().unwrap();
        let rel = write(temp.path(), "nb.ipynb", "not json at all {");

        let (_, summary) = load_documents(temp.path(), &[rel]);
        assert_eq!(summary.failed, 1);
    }
}
