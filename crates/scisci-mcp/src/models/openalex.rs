//! OpenAlex response envelopes and typed record views.
//!
//! Records stay as raw JSON so that exports keep every nested field; the
//! views below only pull out what formatters need.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope returned by every OpenAlex list endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListResponse {
    /// Paging and count metadata.
    #[serde(default)]
    pub meta: Meta,

    /// Matching records.
    #[serde(default)]
    pub results: Vec<Value>,

    /// Buckets when `group_by` was requested.
    #[serde(default)]
    pub group_by: Vec<GroupBucket>,
}

/// `meta` block of a list response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Meta {
    /// Total matching records.
    #[serde(default)]
    pub count: u64,

    /// Current page (basic paging only).
    #[serde(default)]
    pub page: Option<u32>,

    /// Page size.
    #[serde(default)]
    pub per_page: Option<u32>,

    /// Cursor for the next page (cursor paging only).
    #[serde(default)]
    pub next_cursor: Option<String>,

    /// Number of buckets (group_by only).
    #[serde(default)]
    pub groups_count: Option<u64>,
}

/// One `group_by` bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBucket {
    /// Bucket key (an ID or a literal value).
    #[serde(default, deserialize_with = "key_as_string")]
    pub key: String,

    /// Human-readable key.
    #[serde(default)]
    pub key_display_name: Option<String>,

    /// Records in this bucket.
    #[serde(default)]
    pub count: u64,
}

impl GroupBucket {
    /// Display name, falling back to the raw key.
    #[must_use]
    pub fn label(&self) -> &str {
        self.key_display_name.as_deref().unwrap_or(&self.key)
    }
}

// Keys come back as strings for IDs and as numbers/bools for literal fields.
fn key_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Autocomplete endpoint envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutocompleteResponse {
    /// Suggestions.
    #[serde(default)]
    pub results: Vec<AutocompleteMatch>,
}

/// One autocomplete suggestion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutocompleteMatch {
    /// OpenAlex ID.
    #[serde(default)]
    pub id: String,

    /// Display name.
    #[serde(default)]
    pub display_name: String,

    /// Disambiguation hint (e.g. authors of a work, location of an institution).
    #[serde(default)]
    pub hint: Option<String>,

    /// Citations.
    #[serde(default)]
    pub cited_by_count: Option<u64>,

    /// Works.
    #[serde(default)]
    pub works_count: Option<u64>,

    /// Entity type (`work`, `author`, ...).
    #[serde(default)]
    pub entity_type: Option<String>,

    /// External ID (DOI, ORCID, ROR, ISSN).
    #[serde(default)]
    pub external_id: Option<String>,
}

/// Read-only view over a raw OpenAlex work.
#[derive(Debug, Clone, Copy)]
pub struct WorkView<'a>(pub &'a Value);

impl<'a> WorkView<'a> {
    /// OpenAlex ID (`https://openalex.org/W...`).
    #[must_use]
    pub fn id(&self) -> &'a str {
        self.0.get("id").and_then(Value::as_str).unwrap_or("")
    }

    /// Short ID without the URL prefix.
    #[must_use]
    pub fn short_id(&self) -> &'a str {
        short_id(self.id())
    }

    /// Title, falling back to display name, then "Untitled".
    #[must_use]
    pub fn title(&self) -> &'a str {
        self.0
            .get("title")
            .and_then(Value::as_str)
            .or_else(|| self.0.get("display_name").and_then(Value::as_str))
            .unwrap_or("Untitled")
    }

    /// Publication year.
    #[must_use]
    pub fn year(&self) -> Option<i64> {
        self.0.get("publication_year").and_then(Value::as_i64)
    }

    /// Citation count or 0.
    #[must_use]
    pub fn citations(&self) -> u64 {
        self.0.get("cited_by_count").and_then(Value::as_u64).unwrap_or(0)
    }

    /// DOI without the resolver prefix.
    #[must_use]
    pub fn doi(&self) -> Option<&'a str> {
        self.0
            .get("doi")
            .and_then(Value::as_str)
            .map(|d| d.trim_start_matches("https://doi.org/"))
    }

    /// Author display names in authorship order.
    #[must_use]
    pub fn authors(&self) -> Vec<&'a str> {
        self.0
            .get("authorships")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(|a| a.pointer("/author/display_name").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Host venue name.
    #[must_use]
    pub fn venue(&self) -> Option<&'a str> {
        self.0.pointer("/primary_location/source/display_name").and_then(Value::as_str)
    }

    /// Open access flag.
    #[must_use]
    pub fn is_open_access(&self) -> Option<bool> {
        self.0.pointer("/open_access/is_oa").and_then(Value::as_bool)
    }
}

/// Read-only view over any non-work OpenAlex entity.
#[derive(Debug, Clone, Copy)]
pub struct EntityView<'a>(pub &'a Value);

impl<'a> EntityView<'a> {
    /// OpenAlex ID.
    #[must_use]
    pub fn id(&self) -> &'a str {
        self.0.get("id").and_then(Value::as_str).unwrap_or("")
    }

    /// Display name or "Unnamed".
    #[must_use]
    pub fn name(&self) -> &'a str {
        self.0.get("display_name").and_then(Value::as_str).unwrap_or("Unnamed")
    }

    /// Works count.
    #[must_use]
    pub fn works(&self) -> Option<u64> {
        self.0.get("works_count").and_then(Value::as_u64)
    }

    /// Citation count.
    #[must_use]
    pub fn citations(&self) -> Option<u64> {
        self.0.get("cited_by_count").and_then(Value::as_u64)
    }

    /// Secondary identifiers worth showing (ORCID, ROR, ISSN-L, country).
    #[must_use]
    pub fn external_ids(&self) -> Vec<(&'static str, &'a str)> {
        [("ORCID", "orcid"), ("ROR", "ror"), ("ISSN-L", "issn_l"), ("Country", "country_code")]
            .into_iter()
            .filter_map(|(label, key)| self.0.get(key).and_then(Value::as_str).map(|v| (label, v)))
            .collect()
    }
}

/// Strip the `https://openalex.org/` prefix from an ID.
#[must_use]
pub fn short_id(id: &str) -> &str {
    id.trim_start_matches("https://openalex.org/")
}
