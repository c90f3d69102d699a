//! Per-call run statistics.

use std::time::Instant;

use serde::Serialize;

use crate::export::{SavedFile, SavedFiles};

/// What one tool call did upstream and on disk.
#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    /// Tool name.
    pub command: &'static str,
    /// Query as sent (DSL text or OpenAlex parameters).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Upstream requests made.
    pub api_calls: u32,
    /// Records received.
    pub records: usize,
    /// Non-fatal problems.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Files written.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub output_files: Vec<SavedFile>,
    /// Wall time in seconds.
    pub duration_secs: f64,
    #[serde(skip)]
    started: Instant,
}

impl RunStats {
    /// Start timing a call.
    #[must_use]
    pub fn start(command: &'static str) -> Self {
        tracing::debug!(command, "run started");
        Self {
            command,
            query: None,
            api_calls: 0,
            records: 0,
            warnings: Vec::new(),
            output_files: Vec::new(),
            duration_secs: 0.0,
            started: Instant::now(),
        }
    }

    /// Record the issued query.
    pub fn set_query(&mut self, query: impl Into<String>) {
        let query = query.into();
        tracing::debug!(command = self.command, %query, "query issued");
        self.query = Some(query);
    }

    /// Count `calls` requests returning `records` records.
    pub fn api_call(&mut self, calls: u32, records: usize) {
        self.api_calls += calls;
        self.records += records;
    }

    /// Add a warning.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(command = self.command, %message, "run warning");
        self.warnings.push(message);
    }

    /// Fold in the result of a save.
    pub fn saved(&mut self, saved: SavedFiles) {
        for warning in saved.warnings {
            self.warn(warning);
        }
        self.output_files.extend(saved.files);
    }

    /// Stop timing and emit the summary event.
    #[must_use]
    pub fn finish(mut self) -> Self {
        self.duration_secs = self.started.elapsed().as_secs_f64();
        tracing::info!(
            command = self.command,
            api_calls = self.api_calls,
            records = self.records,
            warnings = self.warnings.len(),
            files = self.output_files.len(),
            duration_secs = self.duration_secs,
            "run finished"
        );
        self
    }

    /// First parquet file written, if any.
    #[must_use]
    pub fn parquet_path(&self) -> Option<&std::path::Path> {
        self.output_files.iter().find(|f| f.format == "parquet").map(|f| f.path.as_path())
    }
}
