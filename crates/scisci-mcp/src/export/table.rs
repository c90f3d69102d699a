//! Row reshaping before records hit a columnar or text file.

use std::borrow::Cow;

use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    List,
    Object,
    Primitive,
}

/// Records as table rows: objects pass through, anything else becomes
/// `{"value": <record>}`.
#[must_use]
pub fn as_rows(records: &[Value]) -> Cow<'_, [Value]> {
    if records.iter().all(Value::is_object) {
        return Cow::Borrowed(records);
    }
    Cow::Owned(
        records
            .iter()
            .map(|record| match record {
                Value::Object(_) => record.clone(),
                other => {
                    let mut row = Map::new();
                    row.insert("value".to_string(), other.clone());
                    Value::Object(row)
                }
            })
            .collect(),
    )
}

/// Column names across all records, in first-seen order.
#[must_use]
pub fn columns(records: &[Value]) -> Vec<String> {
    let mut seen = Map::new();
    for record in records {
        if let Value::Object(map) = record {
            for key in map.keys() {
                if !seen.contains_key(key) {
                    seen.insert(key.clone(), Value::Null);
                }
            }
        }
    }
    seen.into_iter().map(|(k, _)| k).collect()
}

/// Give every column one consistent kind so a schema can be inferred.
///
/// Per column the dominant kind among non-empty lists, non-empty objects and
/// non-empty primitives wins (ties favour list, then object); values of any
/// other kind become null, as do empty strings at any depth.
#[must_use]
pub fn clean_for_parquet(records: &[Value]) -> Vec<Value> {
    let kinds: Vec<(String, Kind)> =
        columns(records).into_iter().map(|c| (c.clone(), dominant_kind(records, &c))).collect();

    records
        .iter()
        .map(|record| {
            let Value::Object(map) = record else {
                return record.clone();
            };
            let cleaned = map
                .iter()
                .map(|(key, value)| {
                    let kind = kinds
                        .iter()
                        .find(|(c, _)| c == key)
                        .map_or(Kind::Primitive, |(_, k)| *k);
                    (key.clone(), clean_value(kind, value))
                })
                .collect();
            Value::Object(cleaned)
        })
        .collect()
}

fn dominant_kind(records: &[Value], column: &str) -> Kind {
    let (mut lists, mut objects, mut primitives) = (0usize, 0usize, 0usize);

    for value in records.iter().filter_map(|r| r.get(column)) {
        match value {
            Value::Null => {}
            Value::Array(items) if !items.is_empty() => lists += 1,
            Value::Object(map) if !map.is_empty() => objects += 1,
            Value::Array(_) | Value::Object(_) => {}
            Value::String(s) if s.is_empty() => {}
            _ => primitives += 1,
        }
    }

    if lists == 0 && objects == 0 && primitives == 0 {
        Kind::Primitive
    } else if lists >= objects && lists >= primitives {
        Kind::List
    } else if objects >= primitives {
        Kind::Object
    } else {
        Kind::Primitive
    }
}

fn clean_value(kind: Kind, value: &Value) -> Value {
    match (kind, value) {
        (Kind::List, Value::Array(items)) if !items.is_empty() => clean_nested(value),
        (Kind::Object, Value::Object(map)) if !map.is_empty() => clean_nested(value),
        (Kind::Primitive, Value::Array(_) | Value::Object(_) | Value::Null) => Value::Null,
        (Kind::Primitive, Value::String(s)) if s.is_empty() => Value::Null,
        (Kind::Primitive, other) => other.clone(),
        _ => Value::Null,
    }
}

fn clean_nested(value: &Value) -> Value {
    match value {
        Value::String(s) if s.is_empty() => Value::Null,
        Value::Array(items) => Value::Array(items.iter().map(clean_nested).collect()),
        Value::Object(map) => {
            Value::Object(map.iter().map(|(k, v)| (k.clone(), clean_nested(v))).collect())
        }
        other => other.clone(),
    }
}

/// Replace every list or object value with its JSON text.
#[must_use]
pub fn serialize_nested(records: &[Value]) -> Vec<Value> {
    records
        .iter()
        .map(|record| match record {
            Value::Object(map) => Value::Object(
                map.iter().map(|(k, v)| (k.clone(), encode_nested(v))).collect(),
            ),
            other => other.clone(),
        })
        .collect()
}

fn encode_nested(value: &Value) -> Value {
    match value {
        Value::Array(_) | Value::Object(_) => Value::String(value.to_string()),
        other => other.clone(),
    }
}

/// Render every non-null value as a string.
#[must_use]
pub fn stringify(records: &[Value]) -> Vec<Value> {
    records
        .iter()
        .map(|record| match record {
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| {
                        let text = match v {
                            Value::Null => Value::Null,
                            Value::String(s) => Value::String(s.clone()),
                            other => Value::String(other.to_string()),
                        };
                        (k.clone(), text)
                    })
                    .collect(),
            ),
            other => other.clone(),
        })
        .collect()
}

/// Widen paginated DSL records for tabular output.
///
/// Columns whose first non-null value is an object expand into `col.sub`
/// (recursively); columns whose first non-null value is a list are joined
/// with `"; "`.
#[must_use]
pub fn flatten(records: &[Value]) -> Vec<Value> {
    let shapes: Vec<(String, Option<Kind>)> = columns(records)
        .into_iter()
        .map(|c| {
            let sample = records.iter().filter_map(|r| r.get(&c)).find(|v| !v.is_null());
            let kind = match sample {
                Some(Value::Object(_)) => Some(Kind::Object),
                Some(Value::Array(_)) => Some(Kind::List),
                _ => None,
            };
            (c, kind)
        })
        .collect();

    records
        .iter()
        .map(|record| {
            let Value::Object(map) = record else {
                return record.clone();
            };
            let mut row = Map::new();
            for (column, kind) in &shapes {
                let Some(value) = map.get(column) else {
                    continue;
                };
                match (kind, value) {
                    (Some(Kind::Object), Value::Object(inner)) => {
                        expand_into(&mut row, column, inner);
                    }
                    (Some(Kind::Object), _) => {}
                    (Some(Kind::List), Value::Array(items)) => {
                        row.insert(column.clone(), Value::String(join_items(items)));
                    }
                    _ => {
                        row.insert(column.clone(), value.clone());
                    }
                }
            }
            Value::Object(row)
        })
        .collect()
}

fn expand_into(row: &mut Map<String, Value>, prefix: &str, inner: &Map<String, Value>) {
    for (key, value) in inner {
        let name = format!("{prefix}.{key}");
        match value {
            Value::Object(nested) if !nested.is_empty() => expand_into(row, &name, nested),
            other => {
                row.insert(name, other.clone());
            }
        }
    }
}

fn join_items(items: &[Value]) -> String {
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_columns_first_seen_order() {
        let records = vec![json!({"b": 1, "a": 2}), json!({"c": 3, "a": 4})];
        assert_eq!(columns(&records), ["b", "a", "c"]);
    }

    #[test]
    fn test_as_rows_wraps_scalars() {
        let objects = vec![json!({"id": 1})];
        assert!(matches!(as_rows(&objects), Cow::Borrowed(_)));

        let mixed = vec![json!("protein"), json!({"concept": "dna"}), json!(3)];
        let rows = as_rows(&mixed);
        assert_eq!(rows[0], json!({"value": "protein"}));
        assert_eq!(rows[1], json!({"concept": "dna"}));
        assert_eq!(rows[2], json!({"value": 3}));
    }

    #[test]
    fn test_clean_list_dominant() {
        let records = vec![
            json!({"authors": ["a", "b"]}),
            json!({"authors": ["c"]}),
            json!({"authors": "n/a"}),
            json!({"authors": []}),
        ];
        let cleaned = clean_for_parquet(&records);
        assert_eq!(cleaned[0]["authors"], json!(["a", "b"]));
        assert_eq!(cleaned[2]["authors"], Value::Null);
        assert_eq!(cleaned[3]["authors"], Value::Null);
    }

    #[test]
    fn test_clean_primitive_dominant_and_empty_strings() {
        let records = vec![
            json!({"doi": "10.1/x"}),
            json!({"doi": ""}),
            json!({"doi": "10.1/y"}),
            json!({"doi": {"odd": true}}),
        ];
        let cleaned = clean_for_parquet(&records);
        assert_eq!(cleaned[0]["doi"], json!("10.1/x"));
        assert_eq!(cleaned[1]["doi"], Value::Null);
        assert_eq!(cleaned[3]["doi"], Value::Null);
    }

    #[test]
    fn test_clean_tie_prefers_list_then_object() {
        let records = vec![json!({"x": [1]}), json!({"x": {"a": 1}})];
        let cleaned = clean_for_parquet(&records);
        assert_eq!(cleaned[0]["x"], json!([1]));
        assert_eq!(cleaned[1]["x"], Value::Null);

        let records = vec![json!({"x": {"a": ""}}), json!({"x": 7})];
        let cleaned = clean_for_parquet(&records);
        assert_eq!(cleaned[0]["x"], json!({"a": null}));
        assert_eq!(cleaned[1]["x"], Value::Null);
    }

    #[test]
    fn test_clean_all_empty_column() {
        let records = vec![json!({"x": ""}), json!({"x": []}), json!({"x": null})];
        let cleaned = clean_for_parquet(&records);
        assert!(cleaned.iter().all(|r| r["x"].is_null()));
    }

    #[test]
    fn test_serialize_nested() {
        let rows = serialize_nested(&[json!({"a": [1, 2], "b": {"c": "d"}, "n": 3})]);
        assert_eq!(rows[0]["a"], json!("[1,2]"));
        assert_eq!(rows[0]["b"], json!("{\"c\":\"d\"}"));
        assert_eq!(rows[0]["n"], json!(3));
    }

    #[test]
    fn test_stringify() {
        let rows = stringify(&[json!({"a": 1, "b": null, "c": "x", "d": true})]);
        assert_eq!(rows[0], json!({"a": "1", "b": null, "c": "x", "d": "true"}));
    }

    #[test]
    fn test_flatten() {
        let records = vec![
            json!({"id": "pub.1", "journal": {"id": "j1", "title": "Nature"}, "concepts": ["a", "b"]}),
            json!({"id": "pub.2", "journal": null, "concepts": ["c"]}),
        ];
        let rows = flatten(&records);
        assert_eq!(rows[0]["journal.title"], json!("Nature"));
        assert_eq!(rows[0]["concepts"], json!("a; b"));
        assert!(rows[0].get("journal").is_none());
        assert!(rows[1].get("journal.id").is_none());
        assert_eq!(rows[1]["concepts"], json!("c"));
    }

    #[test]
    fn test_flatten_nested_objects() {
        let rows = flatten(&[json!({"a": {"b": {"c": 1}}})]);
        assert_eq!(rows[0], json!({"a.b.c": 1}));
    }
}
