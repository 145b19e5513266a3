//! Flat records → Arrow `RecordBatch` with per-column type inference

use std::collections::BTreeSet;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanArray, Float64Array, Int64Array, RecordBatch, RecordBatchOptions,
    StringArray,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use serde_json::Value;

use crate::record::{FlatRecord, ORIGINAL_ID};

/// Narrowest column type that holds every non-null value of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Bool,
    Int,
    Float,
    Utf8,
}

impl ColumnKind {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(Self::Bool),
            Value::Number(n) if n.is_i64() => Some(Self::Int),
            Value::Number(_) => Some(Self::Float),
            _ => Some(Self::Utf8),
        }
    }

    fn merge(self, other: Self) -> Self {
        match (self, other) {
            (a, b) if a == b => a,
            (Self::Int, Self::Float) | (Self::Float, Self::Int) => Self::Float,
            _ => Self::Utf8,
        }
    }

    fn data_type(self) -> DataType {
        match self {
            Self::Bool => DataType::Boolean,
            Self::Int => DataType::Int64,
            Self::Float => DataType::Float64,
            Self::Utf8 => DataType::Utf8,
        }
    }
}

/// Column names across all records: `original_id` first, then sorted.
pub fn column_names(records: &[FlatRecord]) -> Vec<String> {
    let keys: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.keys().map(String::as_str))
        .filter(|k| *k != ORIGINAL_ID)
        .collect();
    let has_id = records.iter().any(|r| r.contains_key(ORIGINAL_ID));
    has_id
        .then_some(ORIGINAL_ID)
        .into_iter()
        .chain(keys)
        .map(str::to_string)
        .collect()
}

fn infer_kind(records: &[FlatRecord], name: &str) -> ColumnKind {
    records
        .iter()
        .filter_map(|r| r.get(name).and_then(ColumnKind::of))
        .reduce(ColumnKind::merge)
        .unwrap_or(ColumnKind::Utf8)
}

/// Text form of a value in a Utf8 column; composites become compact JSON
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn build_column(records: &[FlatRecord], name: &str, kind: ColumnKind) -> ArrayRef {
    let cells = records.iter().map(|r| r.get(name).unwrap_or(&Value::Null));
    match kind {
        ColumnKind::Bool => Arc::new(cells.map(Value::as_bool).collect::<BooleanArray>()),
        ColumnKind::Int => Arc::new(cells.map(Value::as_i64).collect::<Int64Array>()),
        ColumnKind::Float => Arc::new(cells.map(Value::as_f64).collect::<Float64Array>()),
        ColumnKind::Utf8 => Arc::new(cells.map(as_text).collect::<StringArray>()),
    }
}

/// Convert an ordered record set into one `RecordBatch`, row `i` = `records[i]`.
///
/// Keys missing from a record are null in its row.
pub fn records_to_batch(records: &[FlatRecord]) -> Result<RecordBatch, ArrowError> {
    let names = column_names(records);
    let mut fields = Vec::with_capacity(names.len());
    let mut columns = Vec::with_capacity(names.len());
    for name in &names {
        let kind = infer_kind(records, name);
        fields.push(Field::new(name, kind.data_type(), true));
        columns.push(build_column(records, name, kind));
    }
    let options = RecordBatchOptions::new().with_row_count(Some(records.len()));
    RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), columns, &options)
}
