// src/schema/types.rs

use serde::Serialize;

/// Declared type of a canonical column.
#[derive(Debug, Serialize, PartialEq, Clone, Copy, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Int,
    Double,
    String,
    Timestamp,
}

/// One canonical column: its name and declared type.
#[derive(Debug, Serialize, PartialEq, Clone, Copy, Eq, Hash)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
}

const fn col(name: &'static str, ty: ColumnType) -> Column {
    Column { name, ty }
}

/// Number of positional fields every raw CSV row is read into.
pub const RAW_FIELD_COUNT: usize = 21;

/// Index of the trailing artifact field produced by the source's stray
/// delimiter. It is always dropped and never interpreted.
pub const ARTIFACT_FIELD_INDEX: usize = 20;

pub const CANONICAL_FIELD_COUNT: usize = 20;

/// Positional mapping from raw field `i` to canonical column `i`.
pub const CANONICAL_COLUMNS: [Column; CANONICAL_FIELD_COUNT] = [
    col("vendor_id", ColumnType::Int),
    col("pickup_datetime", ColumnType::Timestamp),
    col("dropoff_datetime", ColumnType::Timestamp),
    col("store_and_fwd_flag", ColumnType::String),
    col("rate_code_id", ColumnType::Int),
    col("pickup_longitude", ColumnType::Double),
    col("pickup_latitude", ColumnType::Double),
    col("dropoff_longitude", ColumnType::Double),
    col("dropoff_latitude", ColumnType::Double),
    col("passenger_count", ColumnType::Int),
    col("trip_distance", ColumnType::Double),
    col("fare_amount", ColumnType::Double),
    col("extra", ColumnType::Double),
    col("mta_tax", ColumnType::Double),
    col("tip_amount", ColumnType::Double),
    col("tolls_amount", ColumnType::Double),
    col("ehail_fee", ColumnType::Double),
    col("total_amount", ColumnType::Double),
    col("payment_type", ColumnType::Int),
    col("trip_type", ColumnType::String),
];

pub const PICKUP_DATETIME: usize = 1;
pub const DROPOFF_DATETIME: usize = 2;
pub const PICKUP_LONGITUDE: usize = 5;
pub const PICKUP_LATITUDE: usize = 6;

// The artifact slot must sit directly after the last canonical column.
const _: () = assert!(ARTIFACT_FIELD_INDEX == CANONICAL_FIELD_COUNT);
const _: () = assert!(RAW_FIELD_COUNT == CANONICAL_FIELD_COUNT + 1);
