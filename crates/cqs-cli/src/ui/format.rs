//! Utility formatters for CLI output.

use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use cqs_core::StatusReport;

use super::color::terminal_width;

/// Format a byte count with binary units.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[unit])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Render a status report as a table.
pub fn status_table(report: &StatusReport) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(terminal_width() as u16);

    table.add_row(vec!["Repository", report.root.as_str()]);
    table.add_row(vec![
        "Indexed",
        if report.indexed { "yes" } else { "no" },
    ]);

    if let Some(branch) = &report.branch {
        table.add_row(vec!["Branch", branch.as_str()]);
    }
    if let Some(commit) = &report.last_commit {
        table.add_row(vec!["Last commit", commit.as_str()]);
    }
    if let Some(model) = &report.embedding_model {
        table.add_row(vec!["Embedding model", model.as_str()]);
    }
    if let Some(dimension) = report.dimension {
        table.add_row(vec!["Dimension".to_string(), dimension.to_string()]);
    }

    table.add_row(vec!["Files".to_string(), report.total_files.to_string()]);
    table.add_row(vec!["Chunks".to_string(), report.total_chunks.to_string()]);
    table.add_row(vec![
        "Index size".to_string(),
        format_bytes(report.index_size_bytes),
    ]);

    if let Some(at) = &report.indexed_at {
        table.add_row(vec!["Indexed at", at.as_str()]);
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(1_572_864), "1.5 MiB");
    }

    #[test]
    fn test_status_table_contains_fields() {
        let report = StatusReport {
            root: "/repo".to_string(),
            indexed: true,
            has_git: true,
            branch: Some("main".to_string()),
            last_commit: Some("abcdef01".to_string()),
            embedding_model: Some("text-embedding-3-small".to_string()),
            dimension: Some(1536),
            total_chunks: 42,
            total_files: 7,
            index_size_bytes: 2048,
            indexed_at: None,
        };

        let rendered = status_table(&report).to_string();
        assert!(rendered.contains("main"));
        assert!(rendered.contains("abcdef01"));
        assert!(rendered.contains("42"));
        assert!(rendered.contains("2.0 KiB"));
    }
}
