//! Persisting query results.
//!
//! Files are named `{prefix}_{terms}_{YYYYmmdd_HHMMSS}.{ext}` and written in
//! one of five formats:
//! - `dual`: parquet plus JSONL (default)
//! - `parquet`: schema inferred from cleaned records, snappy-compressed
//! - `jsonl`: raw records, nested structure preserved
//! - `tsv` / `csv`: nested values JSON-encoded

mod columnar;
mod table;
mod text;

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

pub use columnar::{ParquetLayout, encode as encode_parquet};
pub use table::{clean_for_parquet, columns, flatten, serialize_nested};
pub use text::render as render_delimited;

use crate::error::ExportResult;
use crate::models::ExportFormat;

/// One written file.
#[derive(Debug, Clone, Serialize)]
pub struct SavedFile {
    /// Absolute or configured path.
    pub path: PathBuf,
    /// `parquet`, `jsonl`, `tsv` or `csv`.
    pub format: &'static str,
    /// Records written.
    pub rows: usize,
    /// File size.
    pub size_bytes: u64,
}

/// Files produced by one save.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SavedFiles {
    /// Written files.
    pub files: Vec<SavedFile>,
    /// Non-fatal notes (parquet fallbacks).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl SavedFiles {
    /// Path of the first file with the given format.
    #[must_use]
    pub fn path(&self, format: &str) -> Option<&Path> {
        self.files.iter().find(|f| f.format == format).map(|f| f.path.as_path())
    }

    /// Check if nothing was written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Where and how a result set is saved.
#[derive(Debug, Clone)]
pub struct SaveRequest<'a> {
    /// Target directory, created when missing.
    pub dir: &'a Path,
    /// Filename prefix (`publications`, `grants_funders`, `works_publication_year`).
    pub prefix: &'a str,
    /// Query terms folded into the filename.
    pub terms: Option<&'a str>,
    /// Output format.
    pub format: ExportFormat,
}

/// `{prefix}_{clean_terms}_{timestamp}` without extension.
///
/// `clean_terms` is the first 30 characters of `terms` with every
/// non-alphanumeric character replaced by `_`.
#[must_use]
pub fn file_stem(prefix: &str, terms: Option<&str>) -> String {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    match terms.filter(|t| !t.is_empty()) {
        Some(terms) => format!("{prefix}_{}_{timestamp}", clean_terms(terms)),
        None => format!("{prefix}_{timestamp}"),
    }
}

/// Filename-safe form of query terms.
#[must_use]
pub fn clean_terms(terms: &str) -> String {
    terms.chars().take(30).map(|c| if c.is_alphanumeric() { c } else { '_' }).collect()
}

/// Save records; tabular formats and JSONL see the same rows.
pub fn save(records: &[Value], request: &SaveRequest<'_>) -> ExportResult<SavedFiles> {
    save_with_raw(records, records, request)
}

/// Save a tabular view alongside the raw records.
///
/// Parquet, TSV and CSV are built from `table`; JSONL always receives `raw`
/// so nested structure survives flattening.
pub fn save_with_raw(
    table: &[Value],
    raw: &[Value],
    request: &SaveRequest<'_>,
) -> ExportResult<SavedFiles> {
    std::fs::create_dir_all(request.dir)?;
    let stem = file_stem(request.prefix, request.terms);
    let mut saved = SavedFiles::default();

    for &ext in request.format.extensions() {
        let path = request.dir.join(format!("{stem}.{ext}"));
        let (bytes, rows) = match ext {
            "parquet" => {
                let (bytes, layout) = columnar::encode(table)?;
                if layout != ParquetLayout::Native {
                    saved.warnings.push(format!(
                        "Native parquet failed for {}, saved with {layout:?} layout",
                        path.display()
                    ));
                }
                (bytes, table.len())
            }
            "jsonl" => (jsonl(raw)?, raw.len()),
            "tsv" => (text::render(table, '\t').into_bytes(), table.len()),
            _ => (text::render(table, ',').into_bytes(), table.len()),
        };

        std::fs::write(&path, &bytes)?;
        tracing::info!(path = %path.display(), rows, bytes = bytes.len(), "Saved results");
        saved.files.push(SavedFile { path, format: ext, rows, size_bytes: bytes.len() as u64 });
    }

    Ok(saved)
}

fn jsonl(records: &[Value]) -> ExportResult<Vec<u8>> {
    let mut out = Vec::new();
    for record in records {
        serde_json::to_writer(&mut out, record)?;
        out.push(b'\n');
    }
    Ok(out)
}
