//! Markdown output formatting.

use std::borrow::Cow;

use serde_json::Value;

use crate::models::{
    AutocompleteMatch, DimensionsSource, EntityType, EntityView, GroupBucket, SourceSchema,
    WorkView,
};
use crate::tracking::RunStats;

/// Format OpenAlex works as Markdown.
#[must_use]
pub fn format_works_markdown(works: &[Value], total: u64) -> String {
    if works.is_empty() {
        return "No works found.".to_string();
    }

    let mut output = format!("# Works (showing {} of {total})\n\n", works.len());
    for (i, work) in works.iter().enumerate() {
        output.push_str(&format_work_markdown(work, i + 1));
        output.push_str("\n---\n\n");
    }
    output
}

/// Format a single OpenAlex work.
#[must_use]
pub fn format_work_markdown(work: &Value, index: usize) -> String {
    let view = WorkView(work);
    let mut output = if index > 0 {
        format!("## {index}. {}\n\n", view.title())
    } else {
        format!("## {}\n\n", view.title())
    };

    let authors = view.authors();
    if !authors.is_empty() {
        let shown: Cow<'_, str> = if authors.len() > 5 {
            Cow::Owned(format!("{} et al.", authors[..5].join(", ")))
        } else {
            Cow::Owned(authors.join(", "))
        };
        output.push_str(&format!("**Authors**: {shown}\n\n"));
    }

    let mut meta = Vec::new();
    if let Some(year) = view.year() {
        meta.push(format!("**Year**: {year}"));
    }
    meta.push(format!("**Citations**: {}", view.citations()));
    if let Some(venue) = view.venue() {
        meta.push(format!("**Venue**: {venue}"));
    }
    if let Some(oa) = view.is_open_access() {
        meta.push(format!("**OA**: {}", if oa { "yes" } else { "no" }));
    }
    output.push_str(&format!("{}\n\n", meta.join(" | ")));

    let mut links = vec![format!("[OpenAlex]({})", view.id())];
    if let Some(doi) = view.doi() {
        links.insert(0, format!("[DOI](https://doi.org/{doi})"));
    }
    output.push_str(&format!("**Links**: {}\n", links.join(" | ")));

    output
}

/// Format non-work OpenAlex entities.
#[must_use]
pub fn format_entities_markdown(entity: EntityType, records: &[Value], total: u64) -> String {
    if records.is_empty() {
        return format!("No {entity} found.");
    }

    let title = capitalize(entity.as_str());
    let mut output = format!("# {title} (showing {} of {total})\n\n", records.len());
    for (i, record) in records.iter().enumerate() {
        output.push_str(&format_entity_markdown(record, i + 1));
        output.push_str("\n---\n\n");
    }
    output
}

/// Format one non-work entity.
#[must_use]
pub fn format_entity_markdown(record: &Value, index: usize) -> String {
    let view = EntityView(record);
    let mut output = if index > 0 {
        format!("## {index}. {}\n\n", view.name())
    } else {
        format!("## {}\n\n", view.name())
    };

    let mut meta = Vec::new();
    if let Some(works) = view.works() {
        meta.push(format!("**Works**: {works}"));
    }
    if let Some(citations) = view.citations() {
        meta.push(format!("**Citations**: {citations}"));
    }
    for (label, value) in view.external_ids() {
        meta.push(format!("**{label}**: {value}"));
    }
    if !meta.is_empty() {
        output.push_str(&format!("{}\n\n", meta.join(" | ")));
    }

    output.push_str(&format!("**ID**: {}\n", view.id()));
    output
}

/// Format `group_by` buckets as a table.
#[must_use]
pub fn format_groups_markdown(
    entity: EntityType,
    field: &str,
    buckets: &[GroupBucket],
    total: u64,
) -> String {
    if buckets.is_empty() {
        return format!("No groups returned for {entity} grouped by `{field}`.");
    }

    let mut output =
        format!("# {} by `{field}` ({} groups, {total} records)\n\n", capitalize(entity.as_str()), buckets.len());
    output.push_str("| Key | Name | Count |\n|---|---|---:|\n");
    for bucket in buckets {
        output.push_str(&format!(
            "| {} | {} | {} |\n",
            cell(&bucket.key),
            cell(bucket.label()),
            bucket.count
        ));
    }
    output
}

/// Format autocomplete suggestions.
#[must_use]
pub fn format_autocomplete_markdown(entity: EntityType, matches: &[AutocompleteMatch]) -> String {
    if matches.is_empty() {
        return format!("No {entity} suggestions.");
    }

    let mut output = format!("# Suggestions ({})\n\n", matches.len());
    for m in matches {
        output.push_str(&format!("- **{}** `{}`", m.display_name, crate::models::short_id(&m.id)));
        if let Some(hint) = m.hint.as_deref().filter(|h| !h.is_empty()) {
            output.push_str(&format!(" - {hint}"));
        }
        if let Some(works) = m.works_count {
            output.push_str(&format!(" ({works} works)"));
        }
        output.push('\n');
    }
    output
}

/// Format Dimensions records (publications, grants, researchers, concepts).
#[must_use]
pub fn format_records_markdown(kind: &str, records: &[Value], total: Option<u64>) -> String {
    if records.is_empty() {
        return format!("No {kind} found.");
    }

    let mut output = match total {
        Some(total) => format!("# {} (showing {} of {total})\n\n", capitalize(kind), records.len()),
        None => format!("# {} ({})\n\n", capitalize(kind), records.len()),
    };
    for (i, record) in records.iter().enumerate() {
        output.push_str(&format!("{}. **{}**", i + 1, record_label(record)));
        let details = record_details(record);
        if !details.is_empty() {
            output.push_str(&format!(" - {}", details.join(" | ")));
        }
        output.push('\n');
    }
    output
}

/// Format facet buckets with their metrics as a table.
#[must_use]
pub fn format_aggregation_markdown(source: DimensionsSource, facet: &str, rows: &[Value]) -> String {
    if rows.is_empty() {
        return format!("No `{facet}` buckets for {source}.");
    }

    let metrics: Vec<String> = crate::export::columns(rows)
        .into_iter()
        .filter(|c| !matches!(c.as_str(), "id" | "name" | "count"))
        .filter(|c| rows.iter().any(|r| r.get(c).is_some_and(is_scalar)))
        .collect();

    let mut output = format!("# {source} by `{facet}` ({} buckets)\n\n", rows.len());
    output.push_str("| Bucket | Count |");
    for m in &metrics {
        output.push_str(&format!(" {m} |"));
    }
    output.push_str("\n|---|---:|");
    output.push_str(&"---:|".repeat(metrics.len()));
    output.push('\n');

    for row in rows {
        output.push_str(&format!(
            "| {} | {} |",
            cell(&record_label(row)),
            row.get("count").map_or_else(String::new, scalar)
        ));
        for m in &metrics {
            output.push_str(&format!(" {} |", row.get(m).map_or_else(String::new, scalar)));
        }
        output.push('\n');
    }
    output
}

/// Summarize a source schema.
#[must_use]
pub fn format_schema_markdown(source: DimensionsSource, schema: &SourceSchema) -> String {
    let mut output = format!("# Schema: {source}\n\n");
    output.push_str(&format!("**Fields**: {}\n\n", schema.fields.len()));

    if !schema.fieldsets.is_empty() {
        output.push_str(&format!("**Fieldsets**: {}\n\n", schema.fieldsets.join(", ")));
    }

    let facets: Vec<String> = schema.facets().into_iter().collect();
    output.push_str(&format!("**Facets** ({}): {}\n\n", facets.len(), facets.join(", ")));

    let filters: Vec<String> = schema.filters().into_iter().collect();
    output.push_str(&format!("**Filters** ({}): {}\n\n", filters.len(), filters.join(", ")));

    let metrics: Vec<String> = schema.metric_names().into_iter().collect();
    if !metrics.is_empty() {
        output.push_str(&format!("**Metrics**: {}\n\n", metrics.join(", ")));
    }
    if !schema.search_fields.is_empty() {
        output.push_str(&format!("**Search fields**: {}\n\n", schema.search_fields.join(", ")));
    }

    output.push_str("| Field | Type | Facet | Filter | Description |\n|---|---|:-:|:-:|---|\n");
    for (name, info) in &schema.fields {
        let description = info.description.as_deref().unwrap_or("");
        output.push_str(&format!(
            "| {name} | {} | {} | {} | {} |\n",
            info.field_type.as_deref().unwrap_or(""),
            if info.is_facet { "✓" } else { "" },
            if info.is_filter { "✓" } else { "" },
            cell(&truncate(description, 80))
        ));
    }
    output
}

/// Footer with run statistics and saved files.
#[must_use]
pub fn format_stats_markdown(stats: &RunStats) -> String {
    let mut output = String::from("\n---\n\n");
    output.push_str(&format!(
        "**Run**: {} API call(s) | {} records | {:.2}s\n",
        stats.api_calls, stats.records, stats.duration_secs
    ));

    if let Some(query) = &stats.query {
        output.push_str(&format!("\n**Query**: `{query}`\n"));
    }

    if !stats.warnings.is_empty() {
        output.push_str(&format!("\n**Warnings** ({}):\n", stats.warnings.len()));
        for warning in &stats.warnings {
            output.push_str(&format!("- {warning}\n"));
        }
    }

    if !stats.output_files.is_empty() {
        output.push_str("\n**Saved**:\n");
        for file in &stats.output_files {
            output.push_str(&format!(
                "- `{}` ({}, {} rows, {})\n",
                file.path.display(),
                file.format,
                file.rows,
                human_size(file.size_bytes)
            ));
        }
        if let Some(parquet) = stats.parquet_path() {
            output.push_str(&format!("\nLoad with `pd.read_parquet('{}')`\n", parquet.display()));
        }
    }

    output
}

/// Titled fenced JSON block for responses without a tabular shape.
#[must_use]
pub fn format_json_block(title: &str, value: &Value) -> String {
    let body = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    format!("# {title}\n\n```json\n{body}\n```\n")
}

/// Best human label for an arbitrary record.
fn record_label(record: &Value) -> String {
    if let Some(text) = record.as_str() {
        return text.to_string();
    }
    for key in ["title", "name", "display_name", "concept", "original_name"] {
        if let Some(text) = record.get(key).and_then(Value::as_str) {
            return text.to_string();
        }
    }

    let first = record.get("first_name").and_then(Value::as_str);
    let last = record.get("last_name").and_then(Value::as_str);
    match (first, last) {
        (Some(f), Some(l)) => format!("{f} {l}"),
        (None, Some(l)) => l.to_string(),
        _ => record.get("id").map_or_else(|| "(unnamed)".to_string(), scalar),
    }
}

fn record_details(record: &Value) -> Vec<String> {
    [
        ("year", "Year"),
        ("times_cited", "Citations"),
        ("funding_usd", "Funding (USD)"),
        ("relevance", "Relevance"),
        ("count", "Count"),
        ("doi", "DOI"),
        ("id", "ID"),
    ]
    .into_iter()
    .filter_map(|(key, label)| {
        record.get(key).filter(|v| is_scalar(v)).map(|v| format!("{label}: {}", scalar(v)))
    })
    .collect()
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn truncate(text: &str, max: usize) -> Cow<'_, str> {
    if text.chars().count() > max {
        Cow::Owned(format!("{}...", text.chars().take(max).collect::<String>()))
    } else {
        Cow::Borrowed(text)
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    chars.next().map_or_else(String::new, |c| {
        c.to_uppercase().collect::<String>() + &chars.as_str().replace('_', " ")
    })
}

fn human_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}
