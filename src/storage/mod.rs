//! Result export.
//!
//! Writes a `BatchResult` either as pretty JSON (records keyed by the export
//! column labels, in column order) or as a TSV table followed by the failed
//! keywords. The format is picked from the file extension.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::types::{BatchResult, FAILED_COLUMN, KEYWORD_COLUMNS};

/// Default output file.
pub const DEFAULT_OUTPUT_FILE: &str = "keyword_results.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Tsv,
}

impl ExportFormat {
    /// `.tsv` and `.txt` get TSV; everything else JSON.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("tsv") | Some("txt") => ExportFormat::Tsv,
            _ => ExportFormat::Json,
        }
    }
}

/// Tabs and line breaks would break the table layout.
fn tsv_cell(value: &str) -> String {
    value.replace(|c: char| c == '\t' || c == '\r' || c == '\n', " ")
}

/// Render the result as TSV: header, one row per record, then the failures.
pub fn render_tsv(result: &BatchResult) -> String {
    let mut out = String::new();
    out.push_str(&KEYWORD_COLUMNS.join("\t"));
    out.push('\n');

    for record in &result.succeeded {
        let row: Vec<String> = record.values().into_iter().map(tsv_cell).collect();
        out.push_str(&row.join("\t"));
        out.push('\n');
    }

    if !result.failed.is_empty() {
        out.push('\n');
        out.push_str(FAILED_COLUMN);
        out.push('\n');
        for keyword in &result.failed {
            out.push_str(&tsv_cell(keyword));
            out.push('\n');
        }
    }

    out
}

/// Write the result to `path` in the format its extension implies.
pub fn save_result(result: &BatchResult, path: &Path) -> Result<()> {
    let contents = match ExportFormat::from_path(path) {
        ExportFormat::Json => serde_json::to_string_pretty(result)
            .context("Failed to serialise keyword results")?,
        ExportFormat::Tsv => render_tsv(result),
    };

    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write results to {}", path.display()))?;

    info!(
        path = %path.display(),
        succeeded = result.succeeded.len(),
        failed = result.failed.len(),
        "Results saved"
    );
    Ok(())
}
