//! Input models for MCP tool parameters.
//!
//! Field names are camelCase on the wire; every optional knob has a serde
//! default so agents can send the minimum.

use serde::{Deserialize, Serialize};

use super::{DimensionsSource, EntityType, ExportFormat, ResponseFormat, SearchField};
use crate::config::paging;

/// Input for `openalex_search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenAlexSearchInput {
    /// Entity collection.
    #[serde(default)]
    pub entity: EntityType,

    /// Free-text query.
    #[serde(default)]
    pub query: Option<String>,

    /// Filter expression (`publication_year:2023,cited_by_count:>100`).
    #[serde(default)]
    pub filter: Option<String>,

    /// Restrict the query to one field (works only).
    #[serde(default)]
    pub search_field: Option<SearchField>,

    /// Sort expression (`cited_by_count:desc`).
    #[serde(default)]
    pub sort: Option<String>,

    /// Comma-separated top-level fields to return.
    #[serde(default)]
    pub select: Option<String>,

    /// Results per page (capped at 200).
    #[serde(default = "default_openalex_limit")]
    pub limit: u32,

    /// Page number for basic paging.
    #[serde(default = "default_page")]
    pub page: u32,

    /// Total results wanted; above 200 switches to cursor paging.
    #[serde(default)]
    pub max_results: Option<u32>,

    /// Write results to disk.
    #[serde(default = "default_true")]
    pub save: bool,

    /// File format when saving.
    #[serde(default)]
    pub export_format: Option<ExportFormat>,

    /// Output format.
    #[serde(default)]
    pub response_format: ResponseFormat,
}

/// Input for `openalex_get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenAlexGetInput {
    /// Entity collection.
    #[serde(default)]
    pub entity: EntityType,

    /// OpenAlex ID, DOI, ORCID or ROR.
    pub id: String,

    /// Comma-separated top-level fields to return.
    #[serde(default)]
    pub select: Option<String>,

    /// Output format.
    #[serde(default)]
    pub response_format: ResponseFormat,
}

/// Input for `openalex_group_by`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenAlexGroupByInput {
    /// Entity collection.
    #[serde(default)]
    pub entity: EntityType,

    /// Field to group by (`publication_year`, `authorships.institutions.id`).
    pub group_by: String,

    /// Free-text query narrowing the grouped set.
    #[serde(default)]
    pub query: Option<String>,

    /// Filter expression.
    #[serde(default)]
    pub filter: Option<String>,

    /// Restrict the query to one field (works only).
    #[serde(default)]
    pub search_field: Option<SearchField>,

    /// Check the field against the live field list before querying.
    #[serde(default = "default_true")]
    pub validate: bool,

    /// Write buckets to disk.
    #[serde(default = "default_true")]
    pub save: bool,

    /// File format when saving.
    #[serde(default)]
    pub export_format: Option<ExportFormat>,

    /// Output format.
    #[serde(default)]
    pub response_format: ResponseFormat,
}

/// Input for `openalex_autocomplete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenAlexAutocompleteInput {
    /// Entity collection.
    #[serde(default)]
    pub entity: EntityType,

    /// Partial name or title.
    pub query: String,

    /// Filter expression.
    #[serde(default)]
    pub filter: Option<String>,

    /// Output format.
    #[serde(default)]
    pub response_format: ResponseFormat,
}

/// Input for `openalex_batch_get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenAlexBatchGetInput {
    /// Entity collection.
    #[serde(default)]
    pub entity: EntityType,

    /// IDs to fetch.
    pub ids: Vec<String>,

    /// Comma-separated top-level fields to return.
    #[serde(default)]
    pub select: Option<String>,

    /// Requests in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Write fetched records to disk.
    #[serde(default = "default_true")]
    pub save: bool,

    /// File format when saving.
    #[serde(default)]
    pub export_format: Option<ExportFormat>,

    /// Output format.
    #[serde(default)]
    pub response_format: ResponseFormat,
}

/// Input for `dimensions_search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionsSearchInput {
    /// Source to search.
    #[serde(default)]
    pub source: DimensionsSource,

    /// Search terms (optional for researchers).
    #[serde(default)]
    pub query: Option<String>,

    /// `where` clause (`year >= 2022 and type = "article"`).
    #[serde(default)]
    pub filters: Option<String>,

    /// Returned fields or fieldsets (`basics+extras`, `id,title,doi`).
    #[serde(default)]
    pub fields: Option<String>,

    /// Results for a single call (max 1000).
    #[serde(default = "default_dimensions_limit")]
    pub limit: u32,

    /// Offset for a single call.
    #[serde(default)]
    pub skip: u32,

    /// Page through all results.
    #[serde(default)]
    pub iterative: bool,

    /// Total results wanted; above 1000 implies `iterative`.
    #[serde(default)]
    pub max_results: Option<u32>,

    /// Expand object columns to `col.sub` and join list columns when saving
    /// paginated results.
    #[serde(default)]
    pub flatten: bool,

    /// Write results to disk.
    #[serde(default = "default_true")]
    pub save: bool,

    /// File format when saving.
    #[serde(default)]
    pub export_format: Option<ExportFormat>,

    /// Output format.
    #[serde(default)]
    pub response_format: ResponseFormat,
}

impl DimensionsSearchInput {
    /// Whether this request needs paginated retrieval.
    #[must_use]
    pub fn needs_iteration(&self) -> bool {
        self.iterative || self.max_results.is_some_and(|m| m > paging::DIMENSIONS_MAX_LIMIT)
    }
}

/// Input for `dimensions_aggregate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionsAggregateInput {
    /// Source to aggregate.
    #[serde(default)]
    pub source: DimensionsSource,

    /// Search terms.
    pub query: String,

    /// Facet to group by (`year`, `research_orgs`, `funders`).
    pub facet: String,

    /// Comma-separated metrics (`citations_total`, `sum(funding)`).
    #[serde(default)]
    pub metrics: Option<String>,

    /// `where` clause.
    #[serde(default)]
    pub filters: Option<String>,

    /// Facet buckets to return.
    #[serde(default = "default_dimensions_limit")]
    pub limit: u32,

    /// Check facet and metrics against the source schema first.
    #[serde(default = "default_true")]
    pub validate: bool,

    /// Write buckets to disk.
    #[serde(default = "default_true")]
    pub save: bool,

    /// File format when saving.
    #[serde(default)]
    pub export_format: Option<ExportFormat>,

    /// Output format.
    #[serde(default)]
    pub response_format: ResponseFormat,
}

/// Input for `dimensions_describe`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionsDescribeInput {
    /// Source to describe.
    #[serde(default)]
    pub source: DimensionsSource,

    /// Output format.
    #[serde(default)]
    pub response_format: ResponseFormat,
}

/// Input for `dimensions_raw`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionsRawInput {
    /// Complete DSL query.
    pub dsl: String,

    /// Page through all results.
    #[serde(default)]
    pub iterative: bool,

    /// Total results wanted; above 1000 implies `iterative`.
    #[serde(default)]
    pub max_results: Option<u32>,

    /// Page size for iterative retrieval (max 1000).
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Flatten paginated records when saving.
    #[serde(default)]
    pub flatten: bool,

    /// Write records to disk.
    #[serde(default = "default_true")]
    pub save: bool,

    /// File format when saving.
    #[serde(default)]
    pub export_format: Option<ExportFormat>,

    /// Output format.
    #[serde(default)]
    pub response_format: ResponseFormat,
}

impl DimensionsRawInput {
    /// Whether this request needs paginated retrieval.
    #[must_use]
    pub fn needs_iteration(&self) -> bool {
        self.iterative || self.max_results.is_some_and(|m| m > paging::DIMENSIONS_MAX_LIMIT)
    }
}

/// Input for `dimensions_extract_concepts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractConceptsInput {
    /// Text to analyse (abstract, paragraph).
    pub text: String,

    /// Include relevance scores.
    #[serde(default)]
    pub return_scores: bool,

    /// Output format.
    #[serde(default)]
    pub response_format: ResponseFormat,
}

/// Input for `dimensions_classify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyInput {
    /// Document title.
    pub title: String,

    /// Document abstract.
    #[serde(rename = "abstract")]
    pub abstract_text: String,

    /// Classification system (`FOR_2020`, `RCDC`, `SDG`, ...).
    #[serde(default = "default_classification_system")]
    pub system: String,

    /// Output format.
    #[serde(default)]
    pub response_format: ResponseFormat,
}

/// Input for `dimensions_extract_affiliations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractAffiliationsInput {
    /// Free-text affiliation string.
    pub affiliation: String,

    /// Output format.
    #[serde(default)]
    pub response_format: ResponseFormat,
}

/// Input for `dimensions_identify_experts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyExpertsInput {
    /// Concepts describing the expertise wanted.
    pub concepts: Vec<String>,

    /// Source mined for expertise.
    #[serde(default)]
    pub source: DimensionsSource,

    /// `where` clause.
    #[serde(default)]
    pub filters: Option<String>,

    /// Researcher IDs to check for organizational/coauthorship overlap.
    #[serde(default)]
    pub overlap_with: Option<Vec<String>>,

    /// Experts to return.
    #[serde(default = "default_dimensions_limit")]
    pub limit: u32,

    /// Write experts to disk.
    #[serde(default = "default_true")]
    pub save: bool,

    /// File format when saving.
    #[serde(default)]
    pub export_format: Option<ExportFormat>,

    /// Output format.
    #[serde(default)]
    pub response_format: ResponseFormat,
}

/// Input for `lint_skills`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LintSkillsInput {
    /// File or directory to lint.
    pub path: String,

    /// Also lint every `*.md` that opens with a frontmatter fence.
    #[serde(default)]
    pub include_all_markdown: bool,

    /// Output format.
    #[serde(default)]
    pub response_format: ResponseFormat,
}

fn default_openalex_limit() -> u32 {
    paging::OPENALEX_DEFAULT_LIMIT
}

fn default_dimensions_limit() -> u32 {
    paging::DIMENSIONS_DEFAULT_LIMIT
}

fn default_batch_size() -> u32 {
    paging::DIMENSIONS_MAX_LIMIT
}

fn default_page() -> u32 {
    1
}

fn default_concurrency() -> usize {
    5
}

fn default_classification_system() -> String {
    "FOR_2020".to_string()
}

fn default_true() -> bool {
    true
}
