//! Dimensions DSL response envelopes.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Envelope returned by `POST /dsl/v2`.
///
/// Besides `_stats` and `_warnings`, every response carries one array per
/// returned source or facet, kept in `data`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DslResponse {
    /// Result counts.
    #[serde(rename = "_stats", default)]
    pub stats: DslStats,

    /// Non-fatal query warnings.
    #[serde(rename = "_warnings", default)]
    pub warnings: Vec<String>,

    /// Everything else, keyed by source/facet name.
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl DslResponse {
    /// Total matching records, when the API reported one.
    #[must_use]
    pub const fn total_count(&self) -> Option<u64> {
        self.stats.total_count
    }

    /// Records under `key`, or an empty slice.
    #[must_use]
    pub fn records(&self, key: &str) -> &[Value] {
        self.data.get(key).and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default()
    }

    /// Take ownership of the records under `key`.
    #[must_use]
    pub fn take_records(&mut self, key: &str) -> Vec<Value> {
        match self.data.remove(key) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        }
    }

    /// First key holding a non-empty array of objects, for responses whose
    /// key is not known upfront (e.g. `identify experts`).
    ///
    /// Arrays of strings such as `fieldsets` in `describe source` are not
    /// records and are skipped.
    #[must_use]
    pub fn first_record_key(&self) -> Option<&str> {
        self.data
            .iter()
            .find(|(_, v)| {
                v.as_array()
                    .is_some_and(|items| !items.is_empty() && items.iter().all(Value::is_object))
            })
            .map(|(k, _)| k.as_str())
    }
}

/// `_stats` block.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DslStats {
    /// Total matching records; absent for function and describe queries.
    #[serde(default)]
    pub total_count: Option<u64>,
}

/// One field from `describe source X`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldInfo {
    /// Field type (`string`, `integer`, `organizations`, ...).
    #[serde(rename = "type", default)]
    pub field_type: Option<String>,

    /// Usable as an aggregation facet.
    #[serde(default)]
    pub is_facet: bool,

    /// Usable in `where`.
    #[serde(default)]
    pub is_filter: bool,

    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Schema of a Dimensions source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceSchema {
    /// Fields keyed by name.
    #[serde(default)]
    pub fields: BTreeMap<String, FieldInfo>,

    /// Named fieldsets (`basics`, `extras`, ...).
    #[serde(default)]
    pub fieldsets: Vec<String>,

    /// Aggregation metrics; an object keyed by name or a list of names/objects.
    #[serde(default)]
    pub metrics: Value,

    /// Fields accepted by `search ... in {field}`.
    #[serde(default)]
    pub search_fields: Vec<String>,
}

impl SourceSchema {
    /// Fields usable as facets.
    #[must_use]
    pub fn facets(&self) -> BTreeSet<String> {
        self.fields.iter().filter(|(_, f)| f.is_facet).map(|(k, _)| k.clone()).collect()
    }

    /// Fields usable as filters.
    #[must_use]
    pub fn filters(&self) -> BTreeSet<String> {
        self.fields.iter().filter(|(_, f)| f.is_filter).map(|(k, _)| k.clone()).collect()
    }

    /// Metric names.
    #[must_use]
    pub fn metric_names(&self) -> BTreeSet<String> {
        match &self.metrics {
            Value::Object(map) => map.keys().cloned().collect(),
            Value::Array(items) => items
                .iter()
                .filter_map(|m| match m {
                    Value::String(s) => Some(s.clone()),
                    Value::Object(o) => o.get("name").and_then(Value::as_str).map(String::from),
                    _ => None,
                })
                .collect(),
            _ => BTreeSet::new(),
        }
    }
}
