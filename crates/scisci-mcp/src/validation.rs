//! Pre-flight checks of field, facet and metric names.
//!
//! Every check takes the valid set discovered from the live API. An empty
//! set means discovery failed; the check then passes and the API decides.

use std::collections::BTreeSet;

use crate::error::{ToolError, ToolResult};
use crate::models::{DimensionsSource, EntityType};

const GROUP_BY_DOCS: &str = "https://docs.openalex.org/how-to-use-the-api/get-groups-of-entities";
const AGGREGATE_FUNCTIONS: [&str; 6] = ["sum", "avg", "count", "min", "max", "median"];
const MAX_SUGGESTIONS: usize = 5;

/// Check an OpenAlex `group_by` field.
pub fn validate_group_by(
    entity: EntityType,
    field: &str,
    valid: &BTreeSet<String>,
) -> ToolResult<()> {
    if valid.is_empty() || valid.contains(field) {
        return Ok(());
    }

    let base = field.split('.').next().unwrap_or(field);
    let mut message = format!("Invalid group_by field '{field}' for {entity}.\n");
    let suggestions = similar(valid, base);
    if !suggestions.is_empty() {
        message.push_str(&format!("Similar valid fields: {}\n", suggestions.join(", ")));
    }
    message.push_str(&format!("See {GROUP_BY_DOCS} for all valid fields."));

    Err(ToolError::validation("groupBy", message))
}

/// Check an OpenAlex `select` list; all unknown entries are reported together.
pub fn validate_select(
    entity: EntityType,
    select: &str,
    valid: &BTreeSet<String>,
) -> ToolResult<()> {
    if valid.is_empty() {
        return Ok(());
    }

    let invalid: Vec<&str> = select
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty() && !valid.contains(*f))
        .collect();
    if invalid.is_empty() {
        return Ok(());
    }

    let message = format!(
        "Invalid select field(s) for {entity}: {}\nValid fields: {}...\n\
         Tip: Complex nested objects like 'grants' cannot be selected. Fetch full records instead.",
        invalid.join(", "),
        first_n(valid, 20)
    );
    Err(ToolError::validation("select", message))
}

/// Check a Dimensions aggregation facet.
pub fn validate_facet(
    source: DimensionsSource,
    facet: &str,
    valid: &BTreeSet<String>,
) -> ToolResult<()> {
    if valid.is_empty() || valid.contains(facet) {
        return Ok(());
    }

    let base = facet.split('_').next().unwrap_or(facet);
    let mut message = format!("Invalid facet '{facet}' for {source}.\n");
    let suggestions = similar(valid, base);
    if !suggestions.is_empty() {
        message.push_str(&format!("Similar valid facets: {}\n", suggestions.join(", ")));
    }
    message.push_str(&format!("Valid facets: {}...\n", first_n(valid, 15)));
    message.push_str(&format!("Use 'describe {source}' to see all available facets."));

    Err(ToolError::validation("facet", message))
}

/// Check a comma-separated Dimensions metric list.
///
/// `fn(field)` passes when `fn` is a known aggregate function; bare names must
/// be schema metrics or `count`.
pub fn validate_metrics(
    source: DimensionsSource,
    metrics: &str,
    valid: &BTreeSet<String>,
) -> ToolResult<()> {
    if valid.is_empty() {
        return Ok(());
    }

    let invalid: Vec<&str> = metrics
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty() && !metric_ok(m, valid))
        .collect();
    if invalid.is_empty() {
        return Ok(());
    }

    let known: Vec<&str> = valid.iter().map(String::as_str).collect();
    let message = format!(
        "Invalid metric(s) for {source}: {}\nValid metrics: {}\n\
         Use 'describe {source}' to see all available metrics.",
        invalid.join(", "),
        known.join(", ")
    );
    Err(ToolError::validation("metrics", message))
}

fn metric_ok(metric: &str, valid: &BTreeSet<String>) -> bool {
    match metric.split_once('(') {
        Some((function, _)) => AGGREGATE_FUNCTIONS.contains(&function.trim()),
        None => metric == "count" || valid.contains(metric),
    }
}

fn similar<'a>(valid: &'a BTreeSet<String>, base: &str) -> Vec<&'a str> {
    valid.iter().filter(|f| f.contains(base)).take(MAX_SUGGESTIONS).map(String::as_str).collect()
}

fn first_n(valid: &BTreeSet<String>, n: usize) -> String {
    valid.iter().take(n).map(String::as_str).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn message(err: ToolError) -> String {
        match err {
            ToolError::Validation { message, .. } => message,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_group_by_known_and_empty_set() {
        let valid = set(&["publication_year", "authorships.institutions.id"]);
        assert!(validate_group_by(EntityType::Works, "publication_year", &valid).is_ok());
        assert!(validate_group_by(EntityType::Works, "anything", &BTreeSet::new()).is_ok());
    }

    #[test]
    fn test_group_by_suggestions() {
        let valid = set(&[
            "authorships.author.id",
            "authorships.countries",
            "authorships.institutions.id",
            "publication_year",
        ]);
        let err = validate_group_by(EntityType::Works, "authorships.bogus", &valid).unwrap_err();
        let msg = message(err);
        assert!(msg.starts_with("Invalid group_by field 'authorships.bogus' for works."));
        assert!(msg.contains("Similar valid fields: authorships.author.id"));
        assert!(!msg.contains("publication_year"));
        assert!(msg.contains(GROUP_BY_DOCS));
    }

    #[test]
    fn test_select_reports_all_invalid() {
        let valid = set(&["id", "doi", "title"]);
        assert!(validate_select(EntityType::Works, "id, doi", &valid).is_ok());

        let msg = message(validate_select(EntityType::Works, "id,grants,foo", &valid).unwrap_err());
        assert!(msg.contains("Invalid select field(s) for works: grants, foo"));
        assert!(msg.contains("Valid fields: doi, id, title..."));
        assert!(msg.contains("cannot be selected"));
    }

    #[test]
    fn test_select_lists_first_twenty() {
        let valid: BTreeSet<String> = (0..30).map(|i| format!("f{i:02}")).collect();
        let msg = message(validate_select(EntityType::Authors, "nope", &valid).unwrap_err());
        assert!(msg.contains("f19"));
        assert!(!msg.contains("f20"));
    }

    #[test]
    fn test_facet_validation() {
        let valid = set(&["research_orgs", "research_org_countries", "funders", "year"]);
        assert!(validate_facet(DimensionsSource::Publications, "year", &valid).is_ok());

        let msg = message(
            validate_facet(DimensionsSource::Publications, "research_bogus", &valid).unwrap_err(),
        );
        assert!(msg.contains("Invalid facet 'research_bogus' for publications."));
        assert!(msg.contains("Similar valid facets: research_org_countries, research_orgs"));
        assert!(msg.contains("Use 'describe publications'"));
    }

    #[test]
    fn test_metrics_validation() {
        let valid = set(&["citations_total", "funding"]);
        let source = DimensionsSource::Grants;

        assert!(validate_metrics(source, "count, funding", &valid).is_ok());
        assert!(validate_metrics(source, "sum(funding),median(x)", &valid).is_ok());

        let msg = message(validate_metrics(source, "bogus, total(funding)", &valid).unwrap_err());
        assert!(msg.contains("Invalid metric(s) for grants: bogus, total(funding)"));
        assert!(msg.contains("Valid metrics: citations_total, funding"));
    }
}
