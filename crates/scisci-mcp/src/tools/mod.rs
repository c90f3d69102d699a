//! MCP tool implementations.
//!
//! Each tool module provides tools that:
//! 1. Parse and validate input parameters
//! 2. Call the OpenAlex or Dimensions client
//! 3. Save results and format them as Markdown or JSON

mod dimensions;
mod docs;
mod openalex;

pub use dimensions::*;
pub use docs::*;
pub use openalex::*;

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use crate::client::{DimensionsClient, OpenAlexClient};
use crate::config::{Config, paging};
use crate::error::{ToolError, ToolResult};
use crate::export::{self, SaveRequest};
use crate::formatters;
use crate::models::{ExportFormat, ResponseFormat};
use crate::tracking::RunStats;

/// Tool execution context.
pub struct ToolContext {
    /// OpenAlex client.
    pub openalex: Arc<OpenAlexClient>,
    /// Dimensions client.
    pub dimensions: Arc<DimensionsClient>,
    /// Server configuration.
    pub config: Arc<Config>,
}

impl ToolContext {
    /// Build both clients from one configuration.
    ///
    /// # Errors
    ///
    /// Returns error if an HTTP client cannot be initialized.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        Ok(Self {
            openalex: Arc::new(OpenAlexClient::new(&config)?),
            dimensions: Arc::new(DimensionsClient::new(&config)?),
            config: Arc::new(config),
        })
    }

    /// Dimensions client, or `Unavailable` when no key is configured.
    pub(crate) fn dimensions(&self) -> ToolResult<&DimensionsClient> {
        if self.dimensions.has_key() {
            Ok(self.dimensions.as_ref())
        } else {
            Err(ToolError::unavailable(
                "Dimensions API key not configured. Set DIMENSIONS_KEY or create \
                 ~/.dimensions/dsl.ini with a [instance.live] section.",
            ))
        }
    }

    pub(crate) fn export_format(&self, requested: Option<ExportFormat>) -> ExportFormat {
        requested.unwrap_or(self.config.export_format)
    }
}

/// Trait for MCP tools.
#[async_trait::async_trait]
pub trait McpTool: Send + Sync {
    /// Tool name (e.g., "openalex_search").
    fn name(&self) -> &'static str;

    /// Tool description for LLM.
    fn description(&self) -> &'static str;

    /// JSON Schema for input parameters.
    fn input_schema(&self) -> serde_json::Value;

    /// Execute the tool with given input.
    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String>;
}

/// Register all tools.
#[must_use]
pub fn register_all_tools() -> Vec<Box<dyn McpTool>> {
    vec![
        // OpenAlex tools (5)
        Box::new(openalex::OpenAlexSearchTool),
        Box::new(openalex::OpenAlexGetTool),
        Box::new(openalex::OpenAlexGroupByTool),
        Box::new(openalex::OpenAlexAutocompleteTool),
        Box::new(openalex::OpenAlexBatchGetTool),
        // Dimensions tools (8)
        Box::new(dimensions::DimensionsSearchTool),
        Box::new(dimensions::DimensionsAggregateTool),
        Box::new(dimensions::DimensionsDescribeTool),
        Box::new(dimensions::DimensionsRawTool),
        Box::new(dimensions::ExtractConceptsTool),
        Box::new(dimensions::ClassifyTool),
        Box::new(dimensions::ExtractAffiliationsTool),
        Box::new(dimensions::IdentifyExpertsTool),
        // Docs tools (1)
        Box::new(docs::LintSkillsTool),
    ]
}

/// Records shown inline; the full set goes to disk.
pub(crate) fn preview(records: &[Value]) -> &[Value] {
    &records[..records.len().min(paging::INLINE_PREVIEW)]
}

/// Save `table` (and `raw` for JSONL) when requested and fold the files into `stats`.
pub(crate) fn save_into(
    stats: &mut RunStats,
    table: &[Value],
    raw: &[Value],
    request: &SaveRequest<'_>,
) -> ToolResult<()> {
    if raw.is_empty() {
        return Ok(());
    }
    let saved = export::save_with_raw(table, raw, request)?;
    stats.saved(saved);
    Ok(())
}

/// Shorthand for a [`SaveRequest`].
pub(crate) fn save_request<'a>(
    dir: &'a Path,
    prefix: &'a str,
    terms: Option<&'a str>,
    format: ExportFormat,
) -> SaveRequest<'a> {
    SaveRequest { dir, prefix, terms, format }
}

/// Render a listing with its run statistics.
pub(crate) fn render_listing(
    format: ResponseFormat,
    stats: &RunStats,
    total: Option<u64>,
    markdown: impl FnOnce() -> String,
    compact: impl FnOnce() -> Vec<Value>,
) -> ToolResult<String> {
    match format {
        ResponseFormat::Markdown => {
            let mut output = markdown();
            output.push_str(&formatters::format_stats_markdown(stats));
            Ok(output)
        }
        ResponseFormat::Json => Ok(serde_json::to_string_pretty(&formatters::results_envelope(
            total,
            compact(),
            stats,
        ))?),
    }
}

/// JSON schema fragment shared by every tool.
pub(crate) fn response_format_schema() -> Value {
    serde_json::json!({
        "type": "string",
        "enum": ["markdown", "json"],
        "default": "markdown"
    })
}

/// JSON schema fragment for `exportFormat`.
pub(crate) fn export_format_schema() -> Value {
    serde_json::json!({
        "type": "string",
        "enum": ["dual", "parquet", "jsonl", "tsv", "csv"],
        "description": "On-disk format (default: server setting, normally dual = parquet + jsonl)"
    })
}
