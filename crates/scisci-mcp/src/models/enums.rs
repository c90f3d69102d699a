//! Enumeration types for API and tool parameters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Output format for tool responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// Human-readable Markdown format.
    #[default]
    Markdown,
    /// Machine-readable JSON format.
    Json,
}

impl ResponseFormat {
    /// Check if this is markdown format.
    #[must_use]
    pub const fn is_markdown(self) -> bool {
        matches!(self, Self::Markdown)
    }

    /// Check if this is JSON format.
    #[must_use]
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// On-disk format for saved query results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Parquet for analysis plus JSONL for peeking.
    #[default]
    Dual,
    /// Columnar, typed, snappy-compressed.
    Parquet,
    /// One raw JSON record per line.
    Jsonl,
    /// Tab-separated values.
    Tsv,
    /// Comma-separated values.
    Csv,
}

impl ExportFormat {
    /// File extensions written for this format.
    #[must_use]
    pub const fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Dual => &["parquet", "jsonl"],
            Self::Parquet => &["parquet"],
            Self::Jsonl => &["jsonl"],
            Self::Tsv => &["tsv"],
            Self::Csv => &["csv"],
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dual" => Ok(Self::Dual),
            "parquet" => Ok(Self::Parquet),
            "jsonl" => Ok(Self::Jsonl),
            "tsv" => Ok(Self::Tsv),
            "csv" => Ok(Self::Csv),
            other => Err(format!("unknown export format '{other}'")),
        }
    }
}

/// OpenAlex entity collections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    /// Scholarly works (papers, books, datasets).
    #[default]
    Works,
    /// Disambiguated authors.
    Authors,
    /// Institutions (ROR-linked).
    Institutions,
    /// Journals, repositories, conferences.
    Sources,
    /// Funding organizations.
    Funders,
    /// Topic taxonomy entries.
    Topics,
}

impl EntityType {
    /// All entity collections.
    pub const ALL: [Self; 6] = [
        Self::Works,
        Self::Authors,
        Self::Institutions,
        Self::Sources,
        Self::Funders,
        Self::Topics,
    ];

    /// API path segment.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Works => "works",
            Self::Authors => "authors",
            Self::Institutions => "institutions",
            Self::Sources => "sources",
            Self::Funders => "funders",
            Self::Topics => "topics",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| format!("unknown OpenAlex entity '{s}'"))
    }
}

/// Field-restricted full-text search for works.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    /// Title only.
    Title,
    /// Abstract only.
    Abstract,
    /// Full text (where indexed).
    Fulltext,
    /// Title and abstract combined.
    TitleAndAbstract,
}

impl SearchField {
    /// Filter key prefix (`{field}.search`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Abstract => "abstract",
            Self::Fulltext => "fulltext",
            Self::TitleAndAbstract => "title_and_abstract",
        }
    }
}

/// Dimensions data sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionsSource {
    /// Publications.
    #[default]
    Publications,
    /// Research grants.
    Grants,
    /// Patents.
    Patents,
    /// Clinical trials.
    ClinicalTrials,
    /// Policy documents.
    PolicyDocuments,
    /// Datasets.
    Datasets,
    /// Journals, books, proceedings.
    SourceTitles,
    /// Reports.
    Reports,
    /// Disambiguated researchers.
    Researchers,
    /// GRID/ROR organizations.
    Organizations,
}

impl DimensionsSource {
    /// All sources, in the order `return {source}` detection checks them.
    pub const ALL: [Self; 10] = [
        Self::Publications,
        Self::Grants,
        Self::Patents,
        Self::ClinicalTrials,
        Self::PolicyDocuments,
        Self::Datasets,
        Self::SourceTitles,
        Self::Reports,
        Self::Researchers,
        Self::Organizations,
    ];

    /// Sources checked by `search {source}` detection.
    pub const SEARCHABLE: [Self; 4] =
        [Self::Publications, Self::Grants, Self::Patents, Self::ClinicalTrials];

    /// DSL identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Publications => "publications",
            Self::Grants => "grants",
            Self::Patents => "patents",
            Self::ClinicalTrials => "clinical_trials",
            Self::PolicyDocuments => "policy_documents",
            Self::Datasets => "datasets",
            Self::SourceTitles => "source_titles",
            Self::Reports => "reports",
            Self::Researchers => "researchers",
            Self::Organizations => "organizations",
        }
    }
}

impl fmt::Display for DimensionsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DimensionsSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|src| src.as_str() == s)
            .ok_or_else(|| format!("unknown Dimensions source '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_format_default() {
        assert_eq!(ResponseFormat::default(), ResponseFormat::Markdown);
        assert!(ResponseFormat::Markdown.is_markdown());
        assert!(!ResponseFormat::Markdown.is_json());
    }

    #[test]
    fn test_export_format_extensions() {
        assert_eq!(ExportFormat::default(), ExportFormat::Dual);
        assert_eq!(ExportFormat::Dual.extensions(), &["parquet", "jsonl"]);
        assert_eq!(ExportFormat::Tsv.extensions(), &["tsv"]);
        assert_eq!("CSV".parse::<ExportFormat>(), Ok(ExportFormat::Csv));
        assert!("xlsx".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_entity_type_parse() {
        assert_eq!("institutions".parse::<EntityType>(), Ok(EntityType::Institutions));
        assert!("concepts".parse::<EntityType>().is_err());
        assert_eq!(EntityType::Funders.to_string(), "funders");
    }

    #[test]
    fn test_dimensions_source_serde() {
        let json = serde_json::to_string(&DimensionsSource::ClinicalTrials).unwrap();
        assert_eq!(json, r#""clinical_trials""#);

        let parsed: DimensionsSource = serde_json::from_str(r#""policy_documents""#).unwrap();
        assert_eq!(parsed, DimensionsSource::PolicyDocuments);
    }

    #[test]
    fn test_search_field_serde() {
        let parsed: SearchField = serde_json::from_str(r#""title_and_abstract""#).unwrap();
        assert_eq!(parsed.as_str(), "title_and_abstract");
    }
}
