pub mod arrow;
pub mod types;

pub use self::arrow::{build_arrow_schema, canonical_schema, map_to_arrow_type, TIMESTAMP_TZ};
pub use types::{
    Column, ColumnType, ARTIFACT_FIELD_INDEX, CANONICAL_COLUMNS, CANONICAL_FIELD_COUNT,
    RAW_FIELD_COUNT,
};
