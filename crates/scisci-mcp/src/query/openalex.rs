//! OpenAlex filter expressions and list parameters.

use std::fmt;

use crate::config::paging;
use crate::models::{EntityType, SearchField};

/// A `filter=` expression: `key:value` clauses joined by `,`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    clauses: Vec<(String, String)>,
}

impl Filter {
    /// Empty filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `key:value`
    #[must_use]
    pub fn clause(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.clauses.push((key.into(), value.to_string()));
        self
    }

    /// `key:>value`
    #[must_use]
    pub fn greater_than(self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.clause(key, format!(">{value}"))
    }

    /// `key:<value`
    #[must_use]
    pub fn less_than(self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.clause(key, format!("<{value}"))
    }

    /// `key:!value`
    #[must_use]
    pub fn exclude(self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.clause(key, format!("!{value}"))
    }

    /// `key:a|b|c`
    #[must_use]
    pub fn any_of<I, V>(self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: fmt::Display,
    {
        let joined = values.into_iter().map(|v| v.to_string()).collect::<Vec<_>>().join("|");
        self.clause(key, joined)
    }

    /// `{field}.search:query`
    #[must_use]
    pub fn search(self, field: &str, query: impl fmt::Display) -> Self {
        self.clause(format!("{field}.search"), query)
    }

    /// Parse an existing expression.
    ///
    /// Clauses are split on commas outside double quotes, then on the first `:`.
    pub fn parse(expr: &str) -> Result<Self, String> {
        let mut clauses = Vec::new();

        for raw in split_top_level(expr) {
            let clause = raw.trim();
            if clause.is_empty() {
                continue;
            }
            let (key, value) = clause
                .split_once(':')
                .ok_or_else(|| format!("filter clause '{clause}' has no ':'"))?;
            let (key, value) = (key.trim(), value.trim());
            if key.is_empty() {
                return Err(format!("filter clause '{clause}' has an empty key"));
            }
            if value.is_empty() {
                return Err(format!("filter '{key}' has an empty value"));
            }
            clauses.push((key.to_string(), value.to_string()));
        }

        Ok(Self { clauses })
    }

    /// Append every clause of `other`.
    #[must_use]
    pub fn and(mut self, other: Self) -> Self {
        self.clauses.extend(other.clauses);
        self
    }

    /// Clause keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.clauses.iter().map(|(k, _)| k.as_str())
    }

    /// Check whether there are no clauses.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Number of clauses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clauses.len()
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.clauses.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{k}:{v}")?;
        }
        Ok(())
    }
}

fn split_top_level(expr: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (i, c) in expr.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(&expr[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&expr[start..]);
    parts
}

/// Query parameters for an OpenAlex list request.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchParams<'a> {
    /// Entity collection.
    pub entity: EntityType,
    /// Free-text query.
    pub query: Option<&'a str>,
    /// Raw filter expression.
    pub filter: Option<&'a str>,
    /// Field-restricted search (works only).
    pub search_field: Option<SearchField>,
    /// Sort expression.
    pub sort: Option<&'a str>,
    /// Comma-separated select list.
    pub select: Option<&'a str>,
}

impl SearchParams<'_> {
    /// Render `search`/`filter`/`sort`/`select` parameters (no paging).
    ///
    /// - works with a search field: `filter={field}.search:{q}[,filter]`
    /// - works without one: `search={q}` plus `filter`
    /// - other entities: `filter=display_name.search:{q}[,filter]`
    #[must_use]
    pub fn build(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        let query = self.query.map(str::trim).filter(|q| !q.is_empty());
        let filter = self.filter.map(str::trim).filter(|f| !f.is_empty());

        match (query, self.entity) {
            (Some(q), EntityType::Works) => match self.search_field {
                Some(field) => {
                    let head = format!("{}.search:{q}", field.as_str());
                    params.push(("filter".into(), join_filter(&head, filter)));
                }
                None => {
                    params.push(("search".into(), q.to_string()));
                    if let Some(f) = filter {
                        params.push(("filter".into(), f.to_string()));
                    }
                }
            },
            (Some(q), _) => {
                let head = format!("display_name.search:{q}");
                params.push(("filter".into(), join_filter(&head, filter)));
            }
            (None, _) => {
                if let Some(f) = filter {
                    params.push(("filter".into(), f.to_string()));
                }
            }
        }

        if let Some(sort) = self.sort.filter(|s| !s.is_empty()) {
            params.push(("sort".into(), sort.to_string()));
        }
        if let Some(select) = self.select.filter(|s| !s.is_empty()) {
            params.push(("select".into(), select.to_string()));
        }

        params
    }

    /// [`build`](Self::build) plus basic `page`/`per_page` paging.
    #[must_use]
    pub fn build_page(&self, limit: u32, page: u32) -> Vec<(String, String)> {
        let mut params = self.build();
        params.push(("page".into(), page.max(1).to_string()));
        params.push(("per_page".into(), per_page(limit).to_string()));
        params
    }
}

/// Page size sent to the API: `min(limit, 200)`, at least 1.
#[must_use]
pub fn per_page(limit: u32) -> u32 {
    limit.clamp(1, paging::OPENALEX_MAX_PER_PAGE)
}

fn join_filter(head: &str, rest: Option<&str>) -> String {
    match rest {
        Some(rest) => format!("{head},{rest}"),
        None => head.to_string(),
    }
}
