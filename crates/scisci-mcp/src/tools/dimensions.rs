//! Dimensions tools: dimensions_search, dimensions_aggregate, dimensions_describe,
//! dimensions_raw, dimensions_extract_concepts, dimensions_classify,
//! dimensions_extract_affiliations, dimensions_identify_experts.

use serde_json::{Value, json};

use super::{
    McpTool, ToolContext, export_format_schema, preview, render_listing, response_format_schema,
    save_into, save_request,
};
use crate::config::paging;
use crate::error::{ToolError, ToolResult};
use crate::export;
use crate::formatters;
use crate::models::{
    ClassifyInput, DimensionsAggregateInput, DimensionsDescribeInput, DimensionsRawInput,
    DimensionsSearchInput, DimensionsSource, DslResponse, ExtractAffiliationsInput,
    ExtractConceptsInput, IdentifyExpertsInput, ResponseFormat,
};
use crate::query::{SearchQuery, dsl};
use crate::tracking::RunStats;
use crate::validation;

/// Record keys tried, in order, when saving a raw query result.
const RAW_SOURCE_KEYS: [&str; 8] = [
    "publications",
    "grants",
    "patents",
    "clinical_trials",
    "researchers",
    "organizations",
    "datasets",
    "reports",
];

/// Facet keys tried after [`RAW_SOURCE_KEYS`]; saved as `facet_{key}`.
const RAW_FACET_KEYS: [&str; 4] = ["year", "funders", "research_orgs", "category_for"];

fn source_schema(sources: &[DimensionsSource]) -> Value {
    json!({
        "type": "string",
        "enum": sources.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
        "default": "publications"
    })
}

/// Table rows for saving: flattened when asked, raw otherwise.
fn table_rows(records: &[Value], flatten: bool) -> Vec<Value> {
    if flatten { export::flatten(records) } else { records.to_vec() }
}

/// Key and filename prefix for a raw query's records.
///
/// Known sources win, then common facets (prefixed `facet_`), then the first
/// array of objects in the response. `None` means the body is not a record
/// list (`describe`, `extract_concepts` without scores).
fn raw_records_key(response: &DslResponse) -> Option<(String, String)> {
    let has = |key: &str| !response.records(key).is_empty();

    RAW_SOURCE_KEYS
        .into_iter()
        .find(|&k| has(k))
        .map(|k| (k.to_string(), k.to_string()))
        .or_else(|| {
            RAW_FACET_KEYS
                .into_iter()
                .find(|&k| has(k))
                .map(|k| (k.to_string(), format!("facet_{k}")))
        })
        .or_else(|| response.first_record_key().map(|k| (k.to_string(), k.to_string())))
}

/// Dimensions search tool.
pub struct DimensionsSearchTool;

#[async_trait::async_trait]
impl McpTool for DimensionsSearchTool {
    fn name(&self) -> &'static str {
        "dimensions_search"
    }

    fn description(&self) -> &'static str {
        "Search a Dimensions source (publications, grants, patents, clinical_trials, \
         researchers, ...) with full-text terms, a DSL where clause and returned fields. \
         Set iterative or maxResults above 1000 to page through everything. Results are \
         saved to disk (parquet + jsonl by default); at most 20 are shown inline."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "source": source_schema(&DimensionsSource::ALL),
                "query": {
                    "type": "string",
                    "description": "Full-text search terms (optional for researchers)"
                },
                "filters": {
                    "type": "string",
                    "description": "DSL where clause, e.g. year >= 2022 and type = \"article\""
                },
                "fields": {
                    "type": "string",
                    "description": "Returned fields or fieldsets, e.g. basics+extras or id,title,doi"
                },
                "limit": {
                    "type": "integer",
                    "default": 20,
                    "maximum": 1000
                },
                "skip": {
                    "type": "integer",
                    "default": 0
                },
                "iterative": {
                    "type": "boolean",
                    "default": false
                },
                "maxResults": {
                    "type": "integer",
                    "description": "Total wanted; above 1000 implies iterative"
                },
                "flatten": {
                    "type": "boolean",
                    "default": false,
                    "description": "Expand nested objects to col.sub columns when saving"
                },
                "save": {
                    "type": "boolean",
                    "default": true
                },
                "exportFormat": export_format_schema(),
                "responseFormat": response_format_schema()
            }
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: Value) -> ToolResult<String> {
        let params: DimensionsSearchInput = serde_json::from_value(input)?;
        let client = ctx.dimensions()?;
        let source = params.source;

        let query = SearchQuery::new(source)
            .terms(params.query.clone().unwrap_or_default())
            .filters(params.filters.as_deref())
            .fields(params.fields.as_deref());
        let mut stats = RunStats::start("dimensions_search");

        let (total, records) = if params.needs_iteration() {
            let base = query.base();
            stats.set_query(base.clone());
            let max = params.max_results.map(u64::from);
            let result = client
                .query_iterative(&base, Some(source), max, paging::DIMENSIONS_MAX_LIMIT)
                .await?;
            stats.api_call(result.pages, result.records.len());
            for warning in result.warnings {
                stats.warn(warning);
            }
            (result.total, result.records)
        } else {
            let limit = params.max_results.unwrap_or(params.limit);
            let query = query.page(limit.clamp(1, paging::DIMENSIONS_MAX_LIMIT), params.skip);
            let text = query.to_string();
            stats.set_query(text.clone());
            let mut response = client.query(&text).await?;
            let records = response.take_records(source.as_str());
            stats.api_call(1, records.len());
            for warning in response.warnings {
                stats.warn(warning);
            }
            (response.stats.total_count, records)
        };

        if params.save {
            let table = table_rows(&records, params.flatten);
            let request = save_request(
                &ctx.config.dimensions_output_dir,
                source.as_str(),
                params.query.as_deref(),
                ctx.export_format(params.export_format),
            );
            save_into(&mut stats, &table, &records, &request)?;
        }
        let stats = stats.finish();

        let shown = preview(&records);
        render_listing(
            params.response_format,
            &stats,
            total,
            || formatters::format_records_markdown(source.as_str(), shown, total),
            || shown.iter().map(formatters::compact_record).collect(),
        )
    }
}

/// Facet aggregation tool.
pub struct DimensionsAggregateTool;

#[async_trait::async_trait]
impl McpTool for DimensionsAggregateTool {
    fn name(&self) -> &'static str {
        "dimensions_aggregate"
    }

    fn description(&self) -> &'static str {
        "Count Dimensions records by a facet (year, research_orgs, funders, category_for, ...) \
         with optional metrics (citations_total, funding). Facet and metrics are checked \
         against the source schema first."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "source": source_schema(&DimensionsSource::ALL),
                "query": {
                    "type": "string",
                    "description": "Full-text search terms"
                },
                "facet": {
                    "type": "string",
                    "description": "Facet to group by"
                },
                "metrics": {
                    "type": "string",
                    "description": "Comma-separated metrics, e.g. citations_total,sum(funding)"
                },
                "filters": {
                    "type": "string",
                    "description": "DSL where clause"
                },
                "limit": {
                    "type": "integer",
                    "default": 20,
                    "maximum": 1000
                },
                "validate": {
                    "type": "boolean",
                    "default": true
                },
                "save": {
                    "type": "boolean",
                    "default": true
                },
                "exportFormat": export_format_schema(),
                "responseFormat": response_format_schema()
            },
            "required": ["query", "facet"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: Value) -> ToolResult<String> {
        let params: DimensionsAggregateInput = serde_json::from_value(input)?;
        let client = ctx.dimensions()?;
        let source = params.source;
        let facet = params.facet.trim();
        if facet.is_empty() {
            return Err(ToolError::validation("facet", "must not be empty"));
        }
        let metrics = params.metrics.as_deref().filter(|m| !m.trim().is_empty());

        if params.validate {
            match client.describe_source(source).await {
                Ok(schema) => {
                    validation::validate_facet(source, facet, &schema.facets())?;
                    if let Some(metrics) = metrics {
                        validation::validate_metrics(source, metrics, &schema.metric_names())?;
                    }
                }
                Err(e) => tracing::warn!(%source, error = %e, "schema unavailable, skipping validation"),
            }
        }

        let text = dsl::aggregate(
            source,
            &params.query,
            params.filters.as_deref(),
            facet,
            metrics,
            params.limit.clamp(1, paging::DIMENSIONS_MAX_LIMIT),
        );
        let mut stats = RunStats::start("dimensions_aggregate");
        stats.set_query(text.clone());

        let mut response = client.query(&text).await?;
        let rows = response.take_records(facet);
        stats.api_call(1, rows.len());
        for warning in response.warnings {
            stats.warn(warning);
        }

        if params.save {
            let prefix = format!("{source}_{facet}");
            let request = save_request(
                &ctx.config.dimensions_output_dir,
                &prefix,
                Some(&params.query),
                ctx.export_format(params.export_format),
            );
            save_into(&mut stats, &rows, &rows, &request)?;
        }
        let stats = stats.finish();

        match params.response_format {
            ResponseFormat::Markdown => {
                let mut output = formatters::format_aggregation_markdown(source, facet, &rows);
                output.push_str(&formatters::format_stats_markdown(&stats));
                Ok(output)
            }
            ResponseFormat::Json => Ok(serde_json::to_string_pretty(&json!({
                "source": source,
                "facet": facet,
                "total": response.stats.total_count,
                "data": rows,
                "stats": stats,
            }))?),
        }
    }
}

/// Source schema tool.
pub struct DimensionsDescribeTool;

#[async_trait::async_trait]
impl McpTool for DimensionsDescribeTool {
    fn name(&self) -> &'static str {
        "dimensions_describe"
    }

    fn description(&self) -> &'static str {
        "List the fields, facets, filters, fieldsets and metrics of a Dimensions source."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "source": source_schema(&DimensionsSource::ALL),
                "responseFormat": response_format_schema()
            }
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: Value) -> ToolResult<String> {
        let params: DimensionsDescribeInput = serde_json::from_value(input)?;
        let schema = ctx.dimensions()?.describe_source(params.source).await?;

        match params.response_format {
            ResponseFormat::Markdown => {
                Ok(formatters::format_schema_markdown(params.source, &schema))
            }
            ResponseFormat::Json => Ok(serde_json::to_string_pretty(schema.as_ref())?),
        }
    }
}

/// Raw DSL tool.
pub struct DimensionsRawTool;

#[async_trait::async_trait]
impl McpTool for DimensionsRawTool {
    fn name(&self) -> &'static str {
        "dimensions_raw"
    }

    fn description(&self) -> &'static str {
        "Run any Dimensions DSL query. With iterative (or maxResults above 1000) the query's \
         limit/skip are rewritten to page through all results. Records are saved under the \
         returned source or facet name."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "dsl": {
                    "type": "string",
                    "description": "Complete DSL query"
                },
                "iterative": {
                    "type": "boolean",
                    "default": false
                },
                "maxResults": {
                    "type": "integer"
                },
                "batchSize": {
                    "type": "integer",
                    "default": 1000,
                    "maximum": 1000
                },
                "flatten": {
                    "type": "boolean",
                    "default": false
                },
                "save": {
                    "type": "boolean",
                    "default": true
                },
                "exportFormat": export_format_schema(),
                "responseFormat": response_format_schema()
            },
            "required": ["dsl"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: Value) -> ToolResult<String> {
        let params: DimensionsRawInput = serde_json::from_value(input)?;
        let client = ctx.dimensions()?;
        let text = params.dsl.trim();
        if text.is_empty() {
            return Err(ToolError::validation("dsl", "must not be empty"));
        }
        let mut stats = RunStats::start("dimensions_raw");

        let (total, key, prefix, records) = if params.needs_iteration() {
            let max = params.max_results.map(u64::from);
            let result = client.query_iterative(text, None, max, params.batch_size).await?;
            stats.set_query(result.base_query.clone());
            stats.api_call(result.pages, result.records.len());
            for warning in result.warnings {
                stats.warn(warning);
            }
            (result.total, result.key.clone(), result.key, result.records)
        } else {
            stats.set_query(text);
            let mut response = client.query(text).await?;
            for warning in std::mem::take(&mut response.warnings) {
                stats.warn(warning);
            }
            let Some((key, prefix)) = raw_records_key(&response) else {
                let data = Value::Object(std::mem::take(&mut response.data));
                stats.api_call(1, 1);
                if params.save {
                    let request = save_request(
                        &ctx.config.dimensions_output_dir,
                        "dsl_result",
                        dsl::extract_terms(text),
                        ctx.export_format(params.export_format),
                    );
                    let rows = std::slice::from_ref(&data);
                    save_into(&mut stats, rows, rows, &request)?;
                }
                let stats = stats.finish();
                let body = json!({"data": data, "stats": stats});
                return match params.response_format {
                    ResponseFormat::Markdown => {
                        let mut output = formatters::format_json_block("DSL result", &body["data"]);
                        output.push_str(&formatters::format_stats_markdown(&stats));
                        Ok(output)
                    }
                    ResponseFormat::Json => Ok(serde_json::to_string_pretty(&body)?),
                };
            };
            let records = response.take_records(&key);
            stats.api_call(1, records.len());
            (response.stats.total_count, key, prefix, records)
        };

        if params.save {
            let table = table_rows(&records, params.flatten);
            let request = save_request(
                &ctx.config.dimensions_output_dir,
                &prefix,
                dsl::extract_terms(text),
                ctx.export_format(params.export_format),
            );
            save_into(&mut stats, &table, &records, &request)?;
        }
        let stats = stats.finish();

        let shown = preview(&records);
        render_listing(
            params.response_format,
            &stats,
            total,
            || formatters::format_records_markdown(&key, shown, total),
            || shown.iter().map(formatters::compact_record).collect(),
        )
    }
}

/// Concept extraction tool.
pub struct ExtractConceptsTool;

#[async_trait::async_trait]
impl McpTool for ExtractConceptsTool {
    fn name(&self) -> &'static str {
        "dimensions_extract_concepts"
    }

    fn description(&self) -> &'static str {
        "Extract research concepts from free text (an abstract or paragraph), optionally \
         with relevance scores."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "Text to analyse"
                },
                "returnScores": {
                    "type": "boolean",
                    "default": false
                },
                "responseFormat": response_format_schema()
            },
            "required": ["text"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: Value) -> ToolResult<String> {
        let params: ExtractConceptsInput = serde_json::from_value(input)?;
        let client = ctx.dimensions()?;
        if params.text.trim().is_empty() {
            return Err(ToolError::validation("text", "must not be empty"));
        }

        let text = dsl::extract_concepts(&params.text, params.return_scores);
        let mut stats = RunStats::start("dimensions_extract_concepts");
        stats.set_query(text.clone());
        let mut response = client.query(&text).await?;
        let concepts = response.take_records("extracted_concepts");
        stats.api_call(1, concepts.len());
        let stats = stats.finish();

        let count = Some(concepts.len() as u64);
        render_listing(
            params.response_format,
            &stats,
            count,
            || formatters::format_records_markdown("concepts", &concepts, count),
            || concepts.clone(),
        )
    }
}

/// Text classification tool.
pub struct ClassifyTool;

#[async_trait::async_trait]
impl McpTool for ClassifyTool {
    fn name(&self) -> &'static str {
        "dimensions_classify"
    }

    fn description(&self) -> &'static str {
        "Classify a title and abstract into a research classification system \
         (FOR_2020, RCDC, HRCS_HC, HRCS_RAC, HRA, ICRP_CT, ICRP_CSO, SDG, UOA, BRA)."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": {
                    "type": "string"
                },
                "abstract": {
                    "type": "string"
                },
                "system": {
                    "type": "string",
                    "default": "FOR_2020"
                },
                "responseFormat": response_format_schema()
            },
            "required": ["title", "abstract"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: Value) -> ToolResult<String> {
        let params: ClassifyInput = serde_json::from_value(input)?;
        let client = ctx.dimensions()?;
        let system = params.system.trim();
        if system.is_empty() {
            return Err(ToolError::validation("system", "must not be empty"));
        }

        let text = dsl::classify(&params.title, &params.abstract_text, system);
        let mut stats = RunStats::start("dimensions_classify");
        stats.set_query(text.clone());
        let mut response = client.query(&text).await?;
        let categories = response.take_records(system);
        stats.api_call(1, categories.len());
        let stats = stats.finish();

        match params.response_format {
            ResponseFormat::Markdown => {
                let mut output = formatters::format_records_markdown(
                    &format!("{system} categories"),
                    &categories,
                    Some(categories.len() as u64),
                );
                output.push_str(&formatters::format_stats_markdown(&stats));
                Ok(output)
            }
            ResponseFormat::Json => Ok(serde_json::to_string_pretty(&json!({
                "system": system,
                "classifications": categories,
                "stats": stats,
            }))?),
        }
    }
}

/// Affiliation resolution tool.
pub struct ExtractAffiliationsTool;

#[async_trait::async_trait]
impl McpTool for ExtractAffiliationsTool {
    fn name(&self) -> &'static str {
        "dimensions_extract_affiliations"
    }

    fn description(&self) -> &'static str {
        "Resolve a free-text affiliation string to GRID/ROR organizations."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "affiliation": {
                    "type": "string",
                    "description": "e.g. Dept. of Physics, MIT, Cambridge MA"
                },
                "responseFormat": response_format_schema()
            },
            "required": ["affiliation"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: Value) -> ToolResult<String> {
        let params: ExtractAffiliationsInput = serde_json::from_value(input)?;
        let client = ctx.dimensions()?;
        if params.affiliation.trim().is_empty() {
            return Err(ToolError::validation("affiliation", "must not be empty"));
        }

        let text = dsl::extract_affiliations(&params.affiliation);
        let mut stats = RunStats::start("dimensions_extract_affiliations");
        stats.set_query(text.clone());
        let mut response = client.query(&text).await?;
        let results = response.take_records("results");
        stats.api_call(1, results.len());
        let stats = stats.finish();

        let body = json!({"results": results, "stats": stats});
        match params.response_format {
            ResponseFormat::Markdown => {
                Ok(formatters::format_json_block("Affiliation matches", &body["results"]))
            }
            ResponseFormat::Json => Ok(serde_json::to_string_pretty(&body)?),
        }
    }
}

/// Expert identification tool.
pub struct IdentifyExpertsTool;

#[async_trait::async_trait]
impl McpTool for IdentifyExpertsTool {
    fn name(&self) -> &'static str {
        "dimensions_identify_experts"
    }

    fn description(&self) -> &'static str {
        "Find researchers with expertise in a set of concepts, optionally annotated with \
         organizational and coauthorship overlap against given researcher IDs."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "concepts": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Concepts describing the expertise wanted"
                },
                "source": source_schema(&[DimensionsSource::Publications, DimensionsSource::Grants]),
                "filters": {
                    "type": "string",
                    "description": "DSL where clause"
                },
                "overlapWith": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Researcher IDs to check for conflicts of interest"
                },
                "limit": {
                    "type": "integer",
                    "default": 20
                },
                "save": {
                    "type": "boolean",
                    "default": true
                },
                "exportFormat": export_format_schema(),
                "responseFormat": response_format_schema()
            },
            "required": ["concepts"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: Value) -> ToolResult<String> {
        let params: IdentifyExpertsInput = serde_json::from_value(input)?;
        let client = ctx.dimensions()?;
        let concepts: Vec<String> = params
            .concepts
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        if concepts.is_empty() {
            return Err(ToolError::validation("concepts", "at least one concept is required"));
        }

        let text = dsl::identify_experts(
            &concepts,
            params.source,
            params.filters.as_deref(),
            params.overlap_with.as_deref().unwrap_or_default(),
            params.limit.clamp(1, paging::DIMENSIONS_MAX_LIMIT),
        );
        let mut stats = RunStats::start("dimensions_identify_experts");
        stats.set_query(text.clone());
        let mut response = client.query(&text).await?;
        let experts = response.take_records("experts");
        stats.api_call(1, experts.len());

        if params.save {
            let terms = concepts.iter().take(3).cloned().collect::<Vec<_>>().join("_");
            let request = save_request(
                &ctx.config.dimensions_output_dir,
                "experts",
                Some(&terms),
                ctx.export_format(params.export_format),
            );
            save_into(&mut stats, &experts, &experts, &request)?;
        }
        let stats = stats.finish();

        let count = Some(experts.len() as u64);
        let shown = preview(&experts);
        render_listing(
            params.response_format,
            &stats,
            count,
            || formatters::format_records_markdown("experts", shown, count),
            || shown.iter().map(formatters::compact_record).collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(body: Value) -> DslResponse {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_raw_key_prefers_sources() {
        let r = response(json!({
            "_stats": {"total_count": 1},
            "year": [{"id": 2020, "count": 1}],
            "grants": [{"id": "grant.1"}]
        }));
        assert_eq!(raw_records_key(&r), Some(("grants".into(), "grants".into())));
    }

    #[test]
    fn test_raw_key_facet_prefix() {
        let r = response(json!({"_stats": {"total_count": 9}, "funders": [{"id": "grid.1"}]}));
        assert_eq!(raw_records_key(&r), Some(("funders".into(), "facet_funders".into())));
    }

    #[test]
    fn test_raw_key_fallbacks() {
        let r = response(json!({"_stats": {"total_count": 1}, "experts": [{"id": "ur.1"}]}));
        assert_eq!(raw_records_key(&r), Some(("experts".into(), "experts".into())));

        let r = response(json!({"fields": {"id": {}}}));
        assert_eq!(raw_records_key(&r), None);

        let r = response(json!({
            "fields": {"id": {"type": "string"}},
            "fieldsets": ["basics", "extras"],
            "search_fields": ["title_only"]
        }));
        assert_eq!(raw_records_key(&r), None);

        let r = response(json!({"extracted_concepts": ["graphene", "oxide"]}));
        assert_eq!(raw_records_key(&r), None);
    }

    #[test]
    fn test_table_rows_flatten() {
        let records = vec![json!({"journal": {"title": "Cell"}})];
        assert_eq!(table_rows(&records, false), records);
        assert_eq!(table_rows(&records, true)[0]["journal.title"], "Cell");
    }
}
