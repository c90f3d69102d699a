//! Dimensions DSL query builders and rewriting helpers.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::DimensionsSource;

static PAGINATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(limit|skip)\s+\d+").expect("valid pagination regex pattern")
});

/// Escape a value for use inside a double-quoted DSL string.
#[must_use]
pub fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// `search {source} [for "terms"] [where ...] return {source}[fields] [limit N] [skip M]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// Source searched and returned.
    pub source: DimensionsSource,
    /// Full-text terms.
    pub terms: Option<String>,
    /// `where` clause body.
    pub filters: Option<String>,
    /// Returned fields (`basics+extras`, `id,title`).
    pub fields: Option<String>,
    /// `limit`; omitted for iterative retrieval.
    pub limit: Option<u32>,
    /// `skip`; rendered only when > 0.
    pub skip: u32,
}

impl SearchQuery {
    /// Query over `source` with no terms.
    #[must_use]
    pub fn new(source: DimensionsSource) -> Self {
        Self { source, ..Self::default() }
    }

    /// Set full-text terms; blank terms are ignored.
    #[must_use]
    pub fn terms(mut self, terms: impl Into<String>) -> Self {
        let terms = terms.into();
        self.terms = (!terms.trim().is_empty()).then_some(terms);
        self
    }

    /// Set the `where` clause.
    #[must_use]
    pub fn filters(mut self, filters: Option<impl Into<String>>) -> Self {
        self.filters = filters.map(Into::into).filter(|f: &String| !f.trim().is_empty());
        self
    }

    /// Set returned fields.
    #[must_use]
    pub fn fields(mut self, fields: Option<impl Into<String>>) -> Self {
        self.fields = fields.map(Into::into).filter(|f: &String| !f.trim().is_empty());
        self
    }

    /// Set `limit` and `skip`.
    #[must_use]
    pub fn page(mut self, limit: u32, skip: u32) -> Self {
        self.limit = Some(limit);
        self.skip = skip;
        self
    }

    /// Query text without `limit`/`skip`, for iterative retrieval.
    #[must_use]
    pub fn base(&self) -> String {
        let mut dsl = format!("search {}", self.source);
        if let Some(terms) = &self.terms {
            dsl.push_str(&format!(" for \"{}\"", escape(terms)));
        }
        if let Some(filters) = &self.filters {
            dsl.push_str(&format!(" where {filters}"));
        }
        match &self.fields {
            Some(fields) => dsl.push_str(&format!(" return {}[{fields}]", self.source)),
            None => dsl.push_str(&format!(" return {}", self.source)),
        }
        dsl
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base())?;
        if let Some(limit) = self.limit {
            write!(f, " limit {limit}")?;
        }
        if self.skip > 0 {
            write!(f, " skip {}", self.skip)?;
        }
        Ok(())
    }
}

/// Facet aggregation query.
#[must_use]
pub fn aggregate(
    source: DimensionsSource,
    terms: &str,
    filters: Option<&str>,
    facet: &str,
    metrics: Option<&str>,
    limit: u32,
) -> String {
    let mut dsl = format!("search {source} for \"{}\"", escape(terms));
    if let Some(filters) = filters.filter(|f| !f.trim().is_empty()) {
        dsl.push_str(&format!(" where {filters}"));
    }
    dsl.push_str(&format!(" return {facet}"));
    if let Some(metrics) = metrics.filter(|m| !m.trim().is_empty()) {
        dsl.push_str(&format!(" aggregate {metrics}"));
    }
    dsl.push_str(&format!(" limit {limit}"));
    dsl
}

/// `extract_concepts("text"[, return_scores=true])`
#[must_use]
pub fn extract_concepts(text: &str, return_scores: bool) -> String {
    if return_scores {
        format!("extract_concepts(\"{}\", return_scores=true)", escape(text))
    } else {
        format!("extract_concepts(\"{}\")", escape(text))
    }
}

/// `classify(title="..", abstract="..", system="..")`
#[must_use]
pub fn classify(title: &str, abstract_text: &str, system: &str) -> String {
    format!(
        "classify(title=\"{}\", abstract=\"{}\", system=\"{}\")",
        escape(title),
        escape(abstract_text),
        escape(system)
    )
}

/// `extract_affiliations(affiliation="..")`
#[must_use]
pub fn extract_affiliations(affiliation: &str) -> String {
    format!("extract_affiliations(affiliation=\"{}\")", escape(affiliation))
}

/// Expert identification from a concept list.
#[must_use]
pub fn identify_experts(
    concepts: &[String],
    source: DimensionsSource,
    filters: Option<&str>,
    overlap_with: &[String],
    limit: u32,
) -> String {
    let mut dsl =
        format!("identify experts from concepts [{}] using {source}", quoted_list(concepts));
    if let Some(filters) = filters.filter(|f| !f.trim().is_empty()) {
        dsl.push_str(&format!(" where {filters}"));
    }
    if !overlap_with.is_empty() {
        dsl.push_str(&format!(
            " annotate organizational, coauthorship overlap with [{}]",
            quoted_list(overlap_with)
        ));
    }
    dsl.push_str(&format!(" return experts limit {limit}"));
    dsl
}

/// `describe source {source}`
#[must_use]
pub fn describe_source(source: DimensionsSource) -> String {
    format!("describe source {source}")
}

fn quoted_list(items: &[String]) -> String {
    items.iter().map(|c| format!("\"{}\"", escape(c))).collect::<Vec<_>>().join(", ")
}

/// Remove every `limit N` / `skip N` (case-insensitive) from a query.
#[must_use]
pub fn strip_pagination(dsl: &str) -> String {
    PAGINATION_RE.replace_all(dsl.trim(), "").trim().to_string()
}

/// Append `limit {limit} skip {skip}`.
#[must_use]
pub fn paginate(base: &str, limit: u32, skip: u64) -> String {
    format!("{base} limit {limit} skip {skip}")
}

/// Source whose records a query returns.
///
/// Checks `return {source}` over every source first, then `search {source}`
/// over the four searchable ones. Text inside quoted strings is ignored.
#[must_use]
pub fn detect_source(dsl: &str) -> Option<DimensionsSource> {
    let lower = blank_quoted(dsl).to_lowercase();
    DimensionsSource::ALL
        .into_iter()
        .find(|s| lower.contains(&format!("return {s}")))
        .or_else(|| {
            DimensionsSource::SEARCHABLE
                .into_iter()
                .find(|s| lower.contains(&format!("search {s}")))
        })
}

/// `dsl` with the contents of double-quoted strings replaced by spaces.
fn blank_quoted(dsl: &str) -> String {
    let mut out = String::with_capacity(dsl.len());
    let (mut quoted, mut escaped) = (false, false);
    for c in dsl.chars() {
        if !quoted {
            quoted = c == '"';
            out.push(c);
        } else if escaped {
            escaped = false;
            out.push(' ');
        } else if c == '\\' {
            escaped = true;
            out.push(' ');
        } else if c == '"' {
            quoted = false;
            out.push(c);
        } else {
            out.push(' ');
        }
    }
    out
}

/// Text between the first `for "` and the next `"`.
#[must_use]
pub fn extract_terms(dsl: &str) -> Option<&str> {
    let start = dsl.find("for \"")? + 5;
    let len = dsl[start..].find('"')?;
    (len > 0).then(|| &dsl[start..start + len])
}
