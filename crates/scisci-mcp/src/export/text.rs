//! Delimited text output (TSV, CSV).

use serde_json::Value;

use super::table;

/// Render records as delimited text with a header row.
///
/// The header is the union of keys in first-seen order; nested values are
/// JSON-encoded and missing or null cells are empty.
#[must_use]
pub fn render(records: &[Value], delimiter: char) -> String {
    let rows = table::as_rows(records);
    let records = rows.as_ref();
    let columns = table::columns(records);
    let mut output = String::new();

    let header: Vec<String> = columns.iter().map(|c| escape(c, delimiter)).collect();
    output.push_str(&header.join(&delimiter.to_string()));
    output.push('\n');

    for record in records {
        let row: Vec<String> = columns
            .iter()
            .map(|c| match record.get(c) {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => escape(s, delimiter),
                Some(other @ (Value::Array(_) | Value::Object(_))) => {
                    escape(&other.to_string(), delimiter)
                }
                Some(other) => other.to_string(),
            })
            .collect();
        output.push_str(&row.join(&delimiter.to_string()));
        output.push('\n');
    }

    output
}

/// Quote a cell when needed and neutralise spreadsheet formulas.
fn escape(s: &str, delimiter: char) -> String {
    let formula = s.starts_with(['=', '+', '-', '@']);
    let needs_quotes = s.contains(delimiter) || s.contains(['"', '\n', '\r']);

    match (needs_quotes, formula) {
        (true, true) => format!("\"'{}\"", s.replace('"', "\"\"")),
        (true, false) => format!("\"{}\"", s.replace('"', "\"\"")),
        (false, true) => format!("'{s}"),
        (false, false) => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_render_csv() {
        let records = vec![
            json!({"id": "W1", "title": "A, B", "year": 2020}),
            json!({"id": "W2", "tags": ["x"], "year": null}),
        ];
        let csv = render(&records, ',');
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "id,title,year,tags");
        assert_eq!(lines[1], "W1,\"A, B\",2020,");
        assert_eq!(lines[2], "W2,,,\"[\"\"x\"\"]\"");
    }

    #[test]
    fn test_render_scalar_records() {
        let tsv = render(&[json!("basics"), json!("extras")], '\t');
        assert_eq!(tsv, "value\nbasics\nextras\n");
    }

    #[test]
    fn test_render_tsv_keeps_commas() {
        let tsv = render(&[json!({"title": "A, B"})], '\t');
        assert_eq!(tsv, "title\nA, B\n");
    }

    #[test]
    fn test_formula_injection() {
        assert_eq!(escape("=SUM(A1)", ','), "'=SUM(A1)");
        assert_eq!(escape("@cmd, x", ','), "\"'@cmd, x\"");
        assert_eq!(escape("say \"hi\"", ','), "\"say \"\"hi\"\"\"");
        assert_eq!(escape("plain", ','), "plain");
    }

    #[test]
    fn test_negative_numbers_untouched() {
        let csv = render(&[json!({"delta": -3})], ',');
        assert_eq!(csv, "delta\n-3\n");
    }
}
