//! DataFrame <-> Arrow IPC file bytes
//!
//! Every column is written as a non-nullable `Float64`, in frame order.
//! NaN cells round-trip as NaN.

use arrow::array::{Array, ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::ipc::reader::FileReader;
use arrow::ipc::writer::FileWriter;
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use jitmine_core::DataFrame;
use std::io::Cursor;
use std::sync::Arc;

use crate::{Result, StorageError};

pub fn encode_table(table: &DataFrame) -> Result<Vec<u8>> {
    let fields: Vec<Field> = table
        .columns()
        .iter()
        .map(|c| Field::new(c.name.as_str(), DataType::Float64, false))
        .collect();
    let schema = Arc::new(Schema::new(fields));
    let arrays: Vec<ArrayRef> = table
        .columns()
        .iter()
        .map(|c| Arc::new(Float64Array::from(c.values.clone())) as ArrayRef)
        .collect();

    // Zero-column frames still carry their row count
    let options = RecordBatchOptions::new().with_row_count(Some(table.n_rows()));
    let batch = RecordBatch::try_new_with_options(schema.clone(), arrays, &options)?;

    let mut buf = Vec::new();
    {
        let mut writer = FileWriter::try_new(&mut buf, &schema)?;
        writer.write(&batch)?;
        writer.finish()?;
    }
    Ok(buf)
}

pub fn decode_table(bytes: &[u8]) -> Result<DataFrame> {
    let reader = FileReader::try_new(Cursor::new(bytes), None)?;
    let schema = reader.schema();
    let mut columns: Vec<(String, Vec<f64>)> = schema
        .fields()
        .iter()
        .map(|f| (f.name().clone(), Vec::new()))
        .collect();

    for batch in reader {
        let batch = batch?;
        for (idx, (name, values)) in columns.iter_mut().enumerate() {
            let array = batch
                .column(idx)
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(|| {
                    StorageError::serialization(format!(
                        "Column {} is {}, expected Float64",
                        name,
                        batch.column(idx).data_type()
                    ))
                })?;
            values.extend(
                (0..array.len()).map(|i| if array.is_null(i) { f64::NAN } else { array.value(i) }),
            );
        }
    }

    DataFrame::from_columns(columns)
        .map_err(|e| StorageError::serialization(format!("Invalid table artifact: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_table_roundtrip_preserves_order_and_nan() {
        let frame = DataFrame::from_columns(vec![
            ("la", vec![1.0, f64::NAN, 3.0]),
            ("entropy", vec![0.5, 0.25, 0.0]),
            ("is_buggy", vec![1.0, 0.0, 1.0]),
        ])
        .unwrap();

        let decoded = decode_table(&encode_table(&frame).unwrap()).unwrap();
        assert_eq!(decoded.column_names(), vec!["la", "entropy", "is_buggy"]);
        assert!(decoded.column("la").unwrap()[1].is_nan());
        assert_eq!(decoded.column("is_buggy"), frame.column("is_buggy"));
    }

    #[test]
    fn test_empty_frame_roundtrip() {
        let decoded = decode_table(&encode_table(&DataFrame::new()).unwrap()).unwrap();
        assert_eq!(decoded.n_cols(), 0);
    }

    #[test]
    fn test_garbage_is_serialization_error() {
        let err = decode_table(b"not arrow").unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::Serialization);
    }
}
