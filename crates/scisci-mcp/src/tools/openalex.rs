//! OpenAlex tools: openalex_search, openalex_get, openalex_group_by,
//! openalex_autocomplete, openalex_batch_get.

use serde_json::{Value, json};

use super::{
    McpTool, ToolContext, export_format_schema, preview, render_listing, response_format_schema,
    save_into, save_request,
};
use crate::config::paging;
use crate::error::{ToolError, ToolResult};
use crate::formatters;
use crate::models::{
    EntityType, OpenAlexAutocompleteInput, OpenAlexBatchGetInput, OpenAlexGetInput,
    OpenAlexGroupByInput, OpenAlexSearchInput, ResponseFormat,
};
use crate::progress::run_parallel;
use crate::query::SearchParams;
use crate::tracking::RunStats;
use crate::validation;

const MAX_BATCH_CONCURRENCY: usize = 10;

fn entity_schema() -> Value {
    json!({
        "type": "string",
        "enum": EntityType::ALL.map(EntityType::as_str),
        "default": "works"
    })
}

/// `works?search=..&filter=..` for run statistics.
fn describe_request(entity: EntityType, params: &[(String, String)]) -> String {
    if params.is_empty() {
        return entity.to_string();
    }
    let query: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{entity}?{}", query.join("&"))
}

fn compact(entity: EntityType, record: &Value) -> Value {
    match entity {
        EntityType::Works => formatters::compact_work(record),
        _ => formatters::compact_entity(record),
    }
}

fn listing_markdown(entity: EntityType, records: &[Value], total: u64) -> String {
    match entity {
        EntityType::Works => formatters::format_works_markdown(records, total),
        _ => formatters::format_entities_markdown(entity, records, total),
    }
}

async fn check_select(ctx: &ToolContext, entity: EntityType, select: Option<&str>) -> ToolResult<()> {
    if let Some(select) = select.filter(|s| !s.trim().is_empty()) {
        let valid = ctx.openalex.valid_select_fields(entity).await;
        validation::validate_select(entity, select, &valid)?;
    }
    Ok(())
}

/// OpenAlex search tool.
pub struct OpenAlexSearchTool;

#[async_trait::async_trait]
impl McpTool for OpenAlexSearchTool {
    fn name(&self) -> &'static str {
        "openalex_search"
    }

    fn description(&self) -> &'static str {
        "Search OpenAlex works, authors, institutions, sources, funders or topics. \
         Supports filter expressions (publication_year:2023,cited_by_count:>100), \
         field-restricted search for works, sorting and select. maxResults above 200 \
         switches to cursor pagination. Results are saved to disk (parquet + jsonl by default); \
         at most 20 are shown inline."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "entity": entity_schema(),
                "query": {
                    "type": "string",
                    "description": "Free-text search"
                },
                "filter": {
                    "type": "string",
                    "description": "OpenAlex filter expression, e.g. publication_year:2023,is_oa:true"
                },
                "searchField": {
                    "type": "string",
                    "enum": ["title", "abstract", "title_and_abstract", "fulltext"],
                    "description": "Restrict the query to one field (works only)"
                },
                "sort": {
                    "type": "string",
                    "description": "e.g. cited_by_count:desc"
                },
                "select": {
                    "type": "string",
                    "description": "Comma-separated top-level fields"
                },
                "limit": {
                    "type": "integer",
                    "default": 25,
                    "maximum": 200
                },
                "page": {
                    "type": "integer",
                    "default": 1,
                    "minimum": 1
                },
                "maxResults": {
                    "type": "integer",
                    "description": "Total wanted; above 200 uses cursor pagination"
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
        let params: OpenAlexSearchInput = serde_json::from_value(input)?;
        let entity = params.entity;
        check_select(ctx, entity, params.select.as_deref()).await?;

        let search = SearchParams {
            entity,
            query: params.query.as_deref(),
            filter: params.filter.as_deref(),
            search_field: params.search_field,
            sort: params.sort.as_deref(),
            select: params.select.as_deref(),
        };
        let mut stats = RunStats::start("openalex_search");

        let (total, records) = match params.max_results {
            Some(max) if max > paging::OPENALEX_MAX_PER_PAGE => {
                let query = search.build();
                stats.set_query(describe_request(entity, &query));
                let result = ctx.openalex.fetch_all(entity, &query, Some(u64::from(max))).await?;
                stats.api_call(result.pages, result.records.len());
                for warning in result.warnings {
                    stats.warn(warning);
                }
                (result.total, result.records)
            }
            max => {
                let limit = max.unwrap_or(params.limit);
                let query = search.build_page(limit, params.page);
                stats.set_query(describe_request(entity, &query));
                let response = ctx.openalex.list(entity, &query).await?;
                stats.api_call(1, response.results.len());
                (response.meta.count, response.results)
            }
        };

        if params.save {
            let dir = &ctx.config.openalex_output_dir;
            let request = save_request(
                dir,
                entity.as_str(),
                params.query.as_deref(),
                ctx.export_format(params.export_format),
            );
            save_into(&mut stats, &records, &records, &request)?;
        }
        let stats = stats.finish();

        let shown = preview(&records);
        render_listing(
            params.response_format,
            &stats,
            Some(total),
            || listing_markdown(entity, shown, total),
            || shown.iter().map(|r| compact(entity, r)).collect(),
        )
    }
}

/// Single-entity lookup tool.
pub struct OpenAlexGetTool;

#[async_trait::async_trait]
impl McpTool for OpenAlexGetTool {
    fn name(&self) -> &'static str {
        "openalex_get"
    }

    fn description(&self) -> &'static str {
        "Fetch one OpenAlex entity by OpenAlex ID (W.., A.., I..), DOI URL, ORCID or ROR."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "entity": entity_schema(),
                "id": {
                    "type": "string",
                    "description": "OpenAlex ID, https://doi.org/..., ORCID or ROR"
                },
                "select": {
                    "type": "string",
                    "description": "Comma-separated top-level fields"
                },
                "responseFormat": response_format_schema()
            },
            "required": ["id"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: Value) -> ToolResult<String> {
        let params: OpenAlexGetInput = serde_json::from_value(input)?;
        if params.id.trim().is_empty() {
            return Err(ToolError::validation("id", "must not be empty"));
        }
        check_select(ctx, params.entity, params.select.as_deref()).await?;

        let record =
            ctx.openalex.get_entity(params.entity, &params.id, params.select.as_deref()).await?;

        match params.response_format {
            ResponseFormat::Markdown => Ok(match params.entity {
                EntityType::Works => formatters::format_work_markdown(&record, 0),
                _ => formatters::format_entity_markdown(&record, 0),
            }),
            ResponseFormat::Json => Ok(serde_json::to_string_pretty(&record)?),
        }
    }
}

/// Group-by aggregation tool.
pub struct OpenAlexGroupByTool;

#[async_trait::async_trait]
impl McpTool for OpenAlexGroupByTool {
    fn name(&self) -> &'static str {
        "openalex_group_by"
    }

    fn description(&self) -> &'static str {
        "Count OpenAlex records by a field (publication_year, authorships.institutions.id, \
         primary_topic.field.id, ...). The field is checked against the live list of valid \
         group_by fields first, with suggestions for near misses."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "entity": entity_schema(),
                "groupBy": {
                    "type": "string",
                    "description": "Field to group by"
                },
                "query": {
                    "type": "string",
                    "description": "Free-text search narrowing the grouped set"
                },
                "filter": {
                    "type": "string",
                    "description": "OpenAlex filter expression"
                },
                "searchField": {
                    "type": "string",
                    "enum": ["title", "abstract", "title_and_abstract", "fulltext"]
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
            "required": ["groupBy"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: Value) -> ToolResult<String> {
        let params: OpenAlexGroupByInput = serde_json::from_value(input)?;
        let entity = params.entity;
        let field = params.group_by.trim();
        if field.is_empty() {
            return Err(ToolError::validation("groupBy", "must not be empty"));
        }

        if params.validate {
            let valid = ctx.openalex.valid_group_by_fields(entity).await;
            validation::validate_group_by(entity, field, &valid)?;
        }

        let search = SearchParams {
            entity,
            query: params.query.as_deref(),
            filter: params.filter.as_deref(),
            search_field: params.search_field,
            ..SearchParams::default()
        };
        let query = search.build();
        let mut stats = RunStats::start("openalex_group_by");
        stats.set_query(format!("{}&group_by={field}", describe_request(entity, &query)));

        let response = ctx.openalex.group_by(entity, field, &query).await?;
        let buckets = response.group_by;
        stats.api_call(1, buckets.len());

        if params.save {
            let rows: Vec<Value> =
                buckets.iter().map(serde_json::to_value).collect::<Result<_, _>>()?;
            let prefix = format!("{entity}_{field}");
            let dir = &ctx.config.openalex_output_dir;
            let request = save_request(
                dir,
                &prefix,
                params.query.as_deref(),
                ctx.export_format(params.export_format),
            );
            save_into(&mut stats, &rows, &rows, &request)?;
        }
        let stats = stats.finish();

        match params.response_format {
            ResponseFormat::Markdown => {
                let mut output =
                    formatters::format_groups_markdown(entity, field, &buckets, response.meta.count);
                output.push_str(&formatters::format_stats_markdown(&stats));
                Ok(output)
            }
            ResponseFormat::Json => Ok(serde_json::to_string_pretty(&json!({
                "entity": entity,
                "groupBy": field,
                "total": response.meta.count,
                "groupsCount": response.meta.groups_count.unwrap_or(buckets.len() as u64),
                "groups": buckets,
                "stats": stats,
            }))?),
        }
    }
}

/// Type-ahead lookup tool.
pub struct OpenAlexAutocompleteTool;

#[async_trait::async_trait]
impl McpTool for OpenAlexAutocompleteTool {
    fn name(&self) -> &'static str {
        "openalex_autocomplete"
    }

    fn description(&self) -> &'static str {
        "Resolve a partial name or title to OpenAlex IDs. Use before filtering by \
         author, institution or source ID."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "entity": entity_schema(),
                "query": {
                    "type": "string",
                    "description": "Partial name or title"
                },
                "filter": {
                    "type": "string",
                    "description": "OpenAlex filter expression"
                },
                "responseFormat": response_format_schema()
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: Value) -> ToolResult<String> {
        let params: OpenAlexAutocompleteInput = serde_json::from_value(input)?;
        if params.query.trim().is_empty() {
            return Err(ToolError::validation("query", "must not be empty"));
        }

        let response = ctx
            .openalex
            .autocomplete(params.entity, params.query.trim(), params.filter.as_deref())
            .await?;

        match params.response_format {
            ResponseFormat::Markdown => {
                Ok(formatters::format_autocomplete_markdown(params.entity, &response.results))
            }
            ResponseFormat::Json => Ok(serde_json::to_string_pretty(&response.results)?),
        }
    }
}

/// Concurrent multi-ID lookup tool.
pub struct OpenAlexBatchGetTool;

#[async_trait::async_trait]
impl McpTool for OpenAlexBatchGetTool {
    fn name(&self) -> &'static str {
        "openalex_batch_get"
    }

    fn description(&self) -> &'static str {
        "Fetch many OpenAlex entities by ID with bounded concurrency. Failed IDs are \
         reported with their errors and do not stop the batch."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "entity": entity_schema(),
                "ids": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "OpenAlex IDs, DOI URLs, ORCIDs or RORs"
                },
                "select": {
                    "type": "string",
                    "description": "Comma-separated top-level fields"
                },
                "concurrency": {
                    "type": "integer",
                    "default": 5,
                    "minimum": 1,
                    "maximum": 10
                },
                "save": {
                    "type": "boolean",
                    "default": true
                },
                "exportFormat": export_format_schema(),
                "responseFormat": response_format_schema()
            },
            "required": ["ids"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: Value) -> ToolResult<String> {
        let params: OpenAlexBatchGetInput = serde_json::from_value(input)?;
        let ids: Vec<String> = params
            .ids
            .iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();
        if ids.is_empty() {
            return Err(ToolError::validation("ids", "at least one ID is required"));
        }

        let entity = params.entity;
        check_select(ctx, entity, params.select.as_deref()).await?;

        let mut stats = RunStats::start("openalex_batch_get");
        stats.set_query(format!("{entity} x{}", ids.len()));

        let client = ctx.openalex.as_ref();
        let select = params.select.as_deref();
        let concurrency = params.concurrency.clamp(1, MAX_BATCH_CONCURRENCY);
        let run = run_parallel(&ids, concurrency, move |id| async move {
            client.get_entity(entity, &id, select).await
        })
        .await;

        let records: Vec<Value> = run.results.into_iter().map(|(_, record)| record).collect();
        stats.api_call(run.progress.total as u32, records.len());
        if run.duplicates > 0 {
            stats.warn(format!("Skipped {} duplicate ID(s)", run.duplicates));
        }
        for failed in &run.progress.failed_items {
            stats.warn(format!("{}: {}", failed.id, failed.error));
        }

        if params.save {
            let prefix = format!("{entity}_batch");
            let dir = &ctx.config.openalex_output_dir;
            let request =
                save_request(dir, &prefix, None, ctx.export_format(params.export_format));
            save_into(&mut stats, &records, &records, &request)?;
        }
        let stats = stats.finish();

        let shown = preview(&records);
        match params.response_format {
            ResponseFormat::Markdown => {
                let mut output = listing_markdown(entity, shown, records.len() as u64);
                if !run.progress.failed_items.is_empty() {
                    output.push_str(&format!(
                        "\n**Failed ({})**: {}\n",
                        run.progress.failed_items.len(),
                        run.progress
                            .failed_items
                            .iter()
                            .map(|f| f.id.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ));
                }
                output.push_str(&formatters::format_stats_markdown(&stats));
                Ok(output)
            }
            ResponseFormat::Json => Ok(serde_json::to_string_pretty(&json!({
                "found": shown.iter().map(|r| compact(entity, r)).collect::<Vec<_>>(),
                "progress": run.progress,
                "duplicates": run.duplicates,
                "stats": stats,
            }))?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_request() {
        let params = vec![
            ("search".to_string(), "graphene".to_string()),
            ("filter".to_string(), "publication_year:2023".to_string()),
        ];
        assert_eq!(
            describe_request(EntityType::Works, &params),
            "works?search=graphene&filter=publication_year:2023"
        );
        assert_eq!(describe_request(EntityType::Authors, &[]), "authors");
    }

    #[test]
    fn test_entity_schema_lists_all() {
        let schema = entity_schema();
        assert_eq!(schema["enum"].as_array().unwrap().len(), EntityType::ALL.len());
    }
}
