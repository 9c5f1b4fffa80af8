use std::fs::File;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use arrow_array::cast::AsArray;
use arrow_array::types::{
    Int16Type, Int32Type, Int64Type, Int8Type, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use arrow_array::{Array, Int32Array, Int64Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Schema};
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};
use trace_events::{FieldValue, RawEvent};

const TIMESTAMP_COLUMN: &str = "timestamp";
const NAME_COLUMN: &str = "name";
const CPU_COLUMN: &str = "cpu_id";

/// Opens a Parquet event export and checks that it carries the columns
/// every event needs
pub fn open(path: &Path) -> Result<ParquetRecordBatchReader> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open input file: {}", path.display()))?;

    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| "Failed to create Parquet reader builder")?;

    check_schema(builder.schema())
        .with_context(|| format!("Unsupported event file: {}", path.display()))?;

    builder
        .build()
        .with_context(|| "Failed to build Arrow reader")
}

/// Reads and converts every event of a Parquet export.
///
/// The whole file is read up front, so a bad batch or row fails the run
/// before any report is produced.
pub fn read_events(path: &Path) -> Result<Vec<RawEvent>> {
    let reader = open(path)?;

    let mut events = Vec::new();
    for batch in reader {
        let batch = batch
            .with_context(|| format!("Failed to read record batch from {}", path.display()))?;
        let rows = batch_to_raw_events(&batch)
            .with_context(|| format!("Invalid event in {}", path.display()))?;
        events.extend(rows);
    }

    Ok(events)
}

/// Verifies the required columns exist with the expected types
pub fn check_schema(schema: &Schema) -> Result<()> {
    for (column, expected) in [
        (TIMESTAMP_COLUMN, DataType::Int64),
        (NAME_COLUMN, DataType::Utf8),
        (CPU_COLUMN, DataType::Int32),
    ] {
        let field = schema
            .field_with_name(column)
            .map_err(|_| anyhow!("{} column not found", column))?;
        if field.data_type() != &expected {
            return Err(anyhow!(
                "{} column is {}, expected {}",
                column,
                field.data_type(),
                expected
            ));
        }
    }
    Ok(())
}

/// Converts every row of a batch into a [`RawEvent`].
///
/// Columns other than `timestamp`, `name` and `cpu_id` become event fields
/// for the rows where they are not null. Integer columns map to
/// [`FieldValue::Int`], string columns to [`FieldValue::Str`]; columns of
/// any other type are ignored.
pub fn batch_to_raw_events(batch: &RecordBatch) -> Result<Vec<RawEvent>> {
    let timestamp_col = batch
        .column_by_name(TIMESTAMP_COLUMN)
        .ok_or_else(|| anyhow!("timestamp column not found"))?
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| anyhow!("timestamp column is not Int64Array"))?;

    let name_col = batch
        .column_by_name(NAME_COLUMN)
        .ok_or_else(|| anyhow!("name column not found"))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| anyhow!("name column is not StringArray"))?;

    let cpu_id_col = batch
        .column_by_name(CPU_COLUMN)
        .ok_or_else(|| anyhow!("cpu_id column not found"))?
        .as_any()
        .downcast_ref::<Int32Array>()
        .ok_or_else(|| anyhow!("cpu_id column is not Int32Array"))?;

    let schema = batch.schema();
    let payload: Vec<(&str, &dyn Array)> = schema
        .fields()
        .iter()
        .zip(batch.columns())
        .map(|(field, column)| (field.name().as_str(), column.as_ref()))
        .filter(|(name, _)| ![TIMESTAMP_COLUMN, NAME_COLUMN, CPU_COLUMN].contains(name))
        .collect();

    let mut events = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        if timestamp_col.is_null(row) || name_col.is_null(row) || cpu_id_col.is_null(row) {
            return Err(anyhow!("Row {} is missing timestamp, name or cpu_id", row));
        }

        let timestamp = u64::try_from(timestamp_col.value(row)).map_err(|_| {
            anyhow!("Row {}: negative timestamp {}", row, timestamp_col.value(row))
        })?;
        let cpu = u32::try_from(cpu_id_col.value(row))
            .map_err(|_| anyhow!("Row {}: negative cpu_id {}", row, cpu_id_col.value(row)))?;

        let mut event = RawEvent::new(name_col.value(row), timestamp, cpu);
        for (name, column) in &payload {
            if let Some(value) = field_value(*column, row) {
                event.fields.insert(name.to_string(), value);
            }
        }
        events.push(event);
    }

    Ok(events)
}

fn field_value(column: &dyn Array, row: usize) -> Option<FieldValue> {
    if column.is_null(row) {
        return None;
    }

    let value = match column.data_type() {
        DataType::Int8 => column.as_primitive::<Int8Type>().value(row) as i64,
        DataType::Int16 => column.as_primitive::<Int16Type>().value(row) as i64,
        DataType::Int32 => column.as_primitive::<Int32Type>().value(row) as i64,
        DataType::Int64 => column.as_primitive::<Int64Type>().value(row),
        DataType::UInt8 => column.as_primitive::<UInt8Type>().value(row) as i64,
        DataType::UInt16 => column.as_primitive::<UInt16Type>().value(row) as i64,
        DataType::UInt32 => column.as_primitive::<UInt32Type>().value(row) as i64,
        // Values past i64::MAX are dropped, decoding reports the missing field
        DataType::UInt64 => i64::try_from(column.as_primitive::<UInt64Type>().value(row)).ok()?,
        DataType::Utf8 => {
            return Some(FieldValue::Str(
                column.as_string::<i32>().value(row).to_string(),
            ))
        }
        _ => return None,
    };

    Some(FieldValue::Int(value))
}
