//! Parquet encoding of JSON records.

use std::sync::Arc;

use arrow_json::ReaderBuilder;
use arrow_json::reader::infer_json_schema_from_iterator;
use arrow_schema::{DataType, Field, Schema};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde_json::Value;

use super::table;
use crate::error::ExportResult;

const BATCH_ROWS: usize = 1024;

/// Encoding that finally produced the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParquetLayout {
    /// Inferred nested schema.
    Native,
    /// Lists and objects stored as JSON text.
    Serialized,
    /// Every column stored as text.
    Strings,
}

/// Encode records as snappy-compressed parquet bytes.
///
/// Tries the cleaned records with an inferred schema first, then the records
/// with nested values JSON-encoded, then every column as a string. Records
/// that are not objects are stored in a single `value` column.
pub fn encode(records: &[Value]) -> ExportResult<(Vec<u8>, ParquetLayout)> {
    let rows = table::as_rows(records);
    let records = rows.as_ref();
    let cleaned = table::clean_for_parquet(records);
    let native_error = match encode_inferred(&cleaned) {
        Ok(bytes) => return Ok((bytes, ParquetLayout::Native)),
        Err(e) => e,
    };
    tracing::warn!(error = %native_error, "native parquet failed, using serialized format");

    match encode_inferred(&table::serialize_nested(records)) {
        Ok(bytes) => Ok((bytes, ParquetLayout::Serialized)),
        Err(e) => {
            tracing::warn!(error = %e, "serialized parquet failed, writing all columns as text");
            Ok((encode_strings(records)?, ParquetLayout::Strings))
        }
    }
}

fn encode_inferred(rows: &[Value]) -> ExportResult<Vec<u8>> {
    let schema = infer_json_schema_from_iterator(rows.iter().map(Ok))?;
    write(rows, Arc::new(schema))
}

fn encode_strings(records: &[Value]) -> ExportResult<Vec<u8>> {
    let fields: Vec<Field> = table::columns(records)
        .into_iter()
        .map(|name| Field::new(name, DataType::Utf8, true))
        .collect();
    write(&table::stringify(records), Arc::new(Schema::new(fields)))
}

fn write(rows: &[Value], schema: Arc<Schema>) -> ExportResult<Vec<u8>> {
    let props = WriterProperties::builder().set_compression(Compression::SNAPPY).build();
    let mut writer = ArrowWriter::try_new(Vec::new(), Arc::clone(&schema), Some(props))?;
    let mut decoder = ReaderBuilder::new(schema)
        .with_batch_size(BATCH_ROWS)
        .with_coerce_primitive(true)
        .build_decoder()?;

    for chunk in rows.chunks(BATCH_ROWS) {
        decoder.serialize(chunk)?;
        if let Some(batch) = decoder.flush()? {
            writer.write(&batch)?;
        }
    }

    Ok(writer.into_inner()?)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use parquet::file::reader::{FileReader, SerializedFileReader};
    use serde_json::json;

    use super::*;

    fn read_rows(bytes: &[u8]) -> i64 {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(bytes).unwrap();
        let reader = SerializedFileReader::new(file).unwrap();
        reader.metadata().file_metadata().num_rows()
    }

    #[test]
    fn test_native_layout() {
        let records = vec![
            json!({"id": "W1", "year": 2020, "authors": ["a", "b"], "venue": {"name": "X"}}),
            json!({"id": "W2", "year": 2021, "authors": [], "venue": {"name": "Y"}}),
        ];
        let (bytes, layout) = encode(&records).unwrap();
        assert_eq!(layout, ParquetLayout::Native);
        assert_eq!(read_rows(&bytes), 2);
    }

    #[test]
    fn test_scalar_records_use_value_column() {
        let records = vec![json!("basics"), json!("extras"), json!({"value": "x", "score": 0.5})];
        let (bytes, _) = encode(&records).unwrap();
        assert_eq!(read_rows(&bytes), 3);
    }

    #[test]
    fn test_mixed_list_items_fall_back() {
        let records = vec![json!({"id": 1, "mixed": [1, {"a": 1}]})];
        let (bytes, layout) = encode(&records).unwrap();
        assert_ne!(layout, ParquetLayout::Native);
        assert_eq!(read_rows(&bytes), 1);
    }
}
