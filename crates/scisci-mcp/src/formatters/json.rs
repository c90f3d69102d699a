//! JSON output formatting with token efficiency.

use serde_json::{Map, Value, json};

use crate::models::{EntityView, WorkView};
use crate::tracking::RunStats;

/// Compact representation of an OpenAlex work.
#[must_use]
pub fn compact_work(work: &Value) -> Value {
    let view = WorkView(work);
    let mut obj = json!({
        "id": view.short_id(),
        "title": view.title(),
        "year": view.year(),
        "citations": view.citations(),
    });

    let authors = view.authors();
    if !authors.is_empty() {
        obj["authors"] = json!(authors);
    }
    if let Some(venue) = view.venue() {
        obj["venue"] = json!(venue);
    }
    if let Some(doi) = view.doi() {
        obj["doi"] = json!(doi);
    }
    if let Some(oa) = view.is_open_access() {
        obj["oa"] = json!(oa);
    }

    obj
}

/// Compact representation of a non-work OpenAlex entity.
#[must_use]
pub fn compact_entity(record: &Value) -> Value {
    let view = EntityView(record);
    let mut obj = json!({
        "id": crate::models::short_id(view.id()),
        "name": view.name(),
    });

    if let Some(works) = view.works() {
        obj["works"] = json!(works);
    }
    if let Some(citations) = view.citations() {
        obj["citations"] = json!(citations);
    }
    for (label, value) in view.external_ids() {
        obj[label.to_ascii_lowercase().replace('-', "_")] = json!(value);
    }

    obj
}

/// Dimensions record with nulls and empty containers removed.
///
/// Author lists are reduced to `"First Last"` strings.
#[must_use]
pub fn compact_record(record: &Value) -> Value {
    let Some(map) = record.as_object() else {
        return record.clone();
    };

    let mut out = Map::new();
    for (key, value) in map {
        match value {
            Value::Null => {}
            Value::Array(items) if items.is_empty() => {}
            Value::Object(inner) if inner.is_empty() => {}
            Value::Array(items) if key == "authors" || key == "researchers" => {
                out.insert(key.clone(), Value::Array(items.iter().map(person_name).collect()));
            }
            other => {
                out.insert(key.clone(), other.clone());
            }
        }
    }
    Value::Object(out)
}

fn person_name(person: &Value) -> Value {
    let first = person.get("first_name").and_then(Value::as_str);
    let last = person.get("last_name").and_then(Value::as_str);
    match (first, last) {
        (Some(f), Some(l)) => json!(format!("{f} {l}")),
        (None, Some(l)) => json!(l),
        _ => person.clone(),
    }
}

/// Standard result envelope: totals, the inline preview and run statistics.
#[must_use]
pub fn results_envelope(total: Option<u64>, shown: Vec<Value>, stats: &RunStats) -> Value {
    json!({
        "total": total,
        "returned": stats.records,
        "shown": shown.len(),
        "results": shown,
        "stats": stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_work() {
        let work = json!({
            "id": "https://openalex.org/W7",
            "title": "T",
            "publication_year": 2020,
            "cited_by_count": 3,
            "authorships": [],
            "abstract_inverted_index": {"a": [0]}
        });
        let obj = compact_work(&work);
        assert_eq!(obj["id"], "W7");
        assert_eq!(obj["year"], 2020);
        assert!(obj.get("authors").is_none());
        assert!(obj.get("abstract_inverted_index").is_none());
    }

    #[test]
    fn test_compact_entity_ids() {
        let author = json!({
            "id": "https://openalex.org/A1",
            "display_name": "Ada",
            "orcid": "https://orcid.org/0000-0001",
            "works_count": 4
        });
        let obj = compact_entity(&author);
        assert_eq!(obj["name"], "Ada");
        assert_eq!(obj["orcid"], "https://orcid.org/0000-0001");
        assert_eq!(obj["works"], 4);
    }

    #[test]
    fn test_compact_record() {
        let record = json!({
            "id": "pub.1",
            "doi": null,
            "concepts": [],
            "authors": [{"first_name": "Ada", "last_name": "Lovelace"}, {"last_name": "Turing"}]
        });
        let obj = compact_record(&record);
        assert_eq!(obj, json!({"id": "pub.1", "authors": ["Ada Lovelace", "Turing"]}));
    }
}
