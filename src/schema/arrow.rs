// src/schema/arrow.rs

use arrow::datatypes::{DataType, Field as ArrowField, Schema as ArrowSchema, SchemaRef, TimeUnit};
use once_cell::sync::Lazy;
use std::sync::Arc;

use super::types::{Column, ColumnType, CANONICAL_COLUMNS};

/// Timezone tag carried by every timestamp column. Naive source times are
/// interpreted as UTC.
pub const TIMESTAMP_TZ: &str = "UTC";

/// Map a canonical column type into an Arrow DataType.
///
/// - Int       → Int32
/// - Double    → Float64
/// - String    → Utf8
/// - Timestamp → Timestamp(µs, UTC)
pub fn map_to_arrow_type(ty: ColumnType) -> DataType {
    match ty {
        ColumnType::Int => DataType::Int32,
        ColumnType::Double => DataType::Float64,
        ColumnType::String => DataType::Utf8,
        ColumnType::Timestamp => {
            DataType::Timestamp(TimeUnit::Microsecond, Some(Arc::from(TIMESTAMP_TZ)))
        }
    }
}

/// Build an ArrowSchema (inside an Arc) from a slice of `Column`s.
pub fn build_arrow_schema(cols: &[Column]) -> SchemaRef {
    let fields: Vec<ArrowField> = cols
        .iter()
        .map(|col| ArrowField::new(col.name, map_to_arrow_type(col.ty), /* nullable = */ true))
        .collect();

    Arc::new(ArrowSchema::new(fields))
}

static CANONICAL_SCHEMA: Lazy<SchemaRef> = Lazy::new(|| build_arrow_schema(&CANONICAL_COLUMNS));

/// The 20-column trip schema shared by ingest and feature derivation.
pub fn canonical_schema() -> SchemaRef {
    CANONICAL_SCHEMA.clone()
}
