// src/features/mod.rs
pub mod calendar;
pub mod geofence;

use arrow::{
    array::{Array, ArrayRef, AsArray, Float64Array, Int32Array, Int64Array, TimestampMicrosecondArray},
    datatypes::{
        DataType, Field, Float64Type, Int32Type, Int64Type, Schema, SchemaRef,
        TimestampMicrosecondType,
    },
    error::ArrowError,
    record_batch::RecordBatch,
};
use once_cell::sync::Lazy;
use rayon::prelude::*;
use serde::Serialize;
use std::{sync::Arc, time::Instant};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::schema::{
    canonical_schema,
    types::{DROPOFF_DATETIME, PICKUP_DATETIME, PICKUP_LATITUDE, PICKUP_LONGITUDE},
};
use crate::session::Session;
use crate::table::{self, Table, WriteReport};

use calendar::{epoch_seconds, PickupCalendar};
use geofence::JFK_AIRPORT;

pub const HOURS_PER_DAY: u32 = 24;
pub const DAYS_PER_WEEK: u32 = 7;

/// One derived column. Every feature reads only canonical columns, so the
/// set can be evaluated in any order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    /// 1 when the pickup hour (UTC) equals the value.
    PickupHour(u32),
    /// 1 when the pickup weekday (0 = Monday) equals the value.
    PickupDow(u32),
    /// Dropoff minus pickup, in whole seconds.
    DurationSeconds,
    /// 1 when the pickup lies in the JFK airport box.
    PickupFromJfk,
}

impl Feature {
    pub fn name(&self) -> String {
        match self {
            Feature::PickupHour(h) => format!("pickup_hour_{}", h),
            Feature::PickupDow(d) => format!("pickup_dow_{}", d),
            Feature::DurationSeconds => "duration_in_second".to_string(),
            Feature::PickupFromJfk => "pickup_from_jfk_airport".to_string(),
        }
    }

    pub fn field(&self) -> Field {
        match self {
            Feature::DurationSeconds => Field::new(self.name(), DataType::Int64, true),
            _ => Field::new(self.name(), DataType::Int32, false),
        }
    }

    fn evaluate(&self, inputs: &Inputs<'_>) -> ArrayRef {
        match *self {
            Feature::PickupHour(h) => flag(inputs.calendar.hours.iter().map(|v| *v == Some(h))),
            Feature::PickupDow(d) => flag(inputs.calendar.days.iter().map(|v| *v == Some(d))),
            Feature::DurationSeconds => Arc::new(duration_seconds(inputs.pickup, inputs.dropoff)),
            Feature::PickupFromJfk => flag(
                inputs
                    .pickup_lon
                    .iter()
                    .zip(inputs.pickup_lat.iter())
                    .map(|(lon, lat)| JFK_AIRPORT.contains(lon, lat)),
            ),
        }
    }
}

fn flag(hits: impl Iterator<Item = bool>) -> ArrayRef {
    Arc::new(Int32Array::from_iter_values(hits.map(i32::from)))
}

fn duration_seconds(
    pickup: &TimestampMicrosecondArray,
    dropoff: &TimestampMicrosecondArray,
) -> Int64Array {
    pickup
        .iter()
        .zip(dropoff.iter())
        .map(|pair| match pair {
            (Some(p), Some(d)) => Some(epoch_seconds(d) - epoch_seconds(p)),
            _ => None,
        })
        .collect()
}

static FEATURES: Lazy<Vec<Feature>> = Lazy::new(|| {
    let mut out = Vec::with_capacity((HOURS_PER_DAY + DAYS_PER_WEEK + 2) as usize);
    out.extend((0..HOURS_PER_DAY).map(Feature::PickupHour));
    out.extend((0..DAYS_PER_WEEK).map(Feature::PickupDow));
    out.push(Feature::DurationSeconds);
    out.push(Feature::PickupFromJfk);
    out
});

/// The derived columns in output order: 24 hour flags, 7 weekday flags,
/// duration, airport flag.
pub fn feature_set() -> &'static [Feature] {
    &FEATURES
}

/// Canonical fields followed by the derived fields.
pub fn enriched_schema(base: &Schema) -> SchemaRef {
    let mut fields: Vec<Field> = base.fields().iter().map(|f| f.as_ref().clone()).collect();
    fields.extend(feature_set().iter().map(Feature::field));
    Arc::new(Schema::new(fields))
}

/// Canonical input columns the features read, plus the shared calendar.
struct Inputs<'a> {
    pickup: &'a TimestampMicrosecondArray,
    dropoff: &'a TimestampMicrosecondArray,
    pickup_lon: &'a Float64Array,
    pickup_lat: &'a Float64Array,
    calendar: PickupCalendar,
}

impl<'a> Inputs<'a> {
    fn from_batch(batch: &'a RecordBatch) -> Result<Self> {
        let pickup = timestamp_column(batch, PICKUP_DATETIME)?;
        let dropoff = timestamp_column(batch, DROPOFF_DATETIME)?;
        let pickup_lon = double_column(batch, PICKUP_LONGITUDE)?;
        let pickup_lat = double_column(batch, PICKUP_LATITUDE)?;
        Ok(Inputs {
            pickup,
            dropoff,
            pickup_lon,
            pickup_lat,
            calendar: PickupCalendar::from_micros(pickup.iter()),
        })
    }
}

fn timestamp_column(batch: &RecordBatch, idx: usize) -> Result<&TimestampMicrosecondArray> {
    batch
        .column(idx)
        .as_primitive_opt::<TimestampMicrosecondType>()
        .ok_or_else(|| wrong_type(batch, idx, "Timestamp(Microsecond)"))
}

fn double_column(batch: &RecordBatch, idx: usize) -> Result<&Float64Array> {
    batch
        .column(idx)
        .as_primitive_opt::<Float64Type>()
        .ok_or_else(|| wrong_type(batch, idx, "Float64"))
}

fn wrong_type(batch: &RecordBatch, idx: usize, want: &str) -> PipelineError {
    let schema = batch.schema();
    let field = schema.field(idx);
    PipelineError::Batch(ArrowError::SchemaError(format!(
        "column {} ({}) is {}, expected {}",
        idx,
        field.name(),
        field.data_type(),
        want
    )))
}

/// Counters gathered while deriving features.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeatureStats {
    pub rows: u64,
    pub null_pickups: u64,
    pub jfk_pickups: u64,
    pub negative_durations: u64,
}

impl FeatureStats {
    fn add(&mut self, other: FeatureStats) {
        self.rows += other.rows;
        self.null_pickups += other.null_pickups;
        self.jfk_pickups += other.jfk_pickups;
        self.negative_durations += other.negative_durations;
    }
}

/// Append the derived columns to one canonical batch. The expressions run in
/// parallel on the current rayon pool.
pub fn enrich_batch(batch: &RecordBatch, schema: &SchemaRef) -> Result<(RecordBatch, FeatureStats)> {
    let inputs = Inputs::from_batch(batch)?;

    let derived: Vec<ArrayRef> = feature_set()
        .par_iter()
        .map(|f| f.evaluate(&inputs))
        .collect();

    let derived_column = |feature: Feature| {
        feature_set()
            .iter()
            .position(|f| *f == feature)
            .map(|i| &derived[i])
    };
    let stats = FeatureStats {
        rows: batch.num_rows() as u64,
        null_pickups: inputs.pickup.null_count() as u64,
        jfk_pickups: derived_column(Feature::PickupFromJfk)
            .and_then(|c| c.as_primitive_opt::<Int32Type>())
            .map_or(0, |c| c.values().iter().filter(|v| **v == 1).count() as u64),
        negative_durations: derived_column(Feature::DurationSeconds)
            .and_then(|c| c.as_primitive_opt::<Int64Type>())
            .map_or(0, |c| c.iter().flatten().filter(|d| *d < 0).count() as u64),
    };

    let mut columns = batch.columns().to_vec();
    columns.extend(derived);
    let enriched = RecordBatch::try_new(schema.clone(), columns)?;
    Ok((enriched, stats))
}

/// Enrich every batch of a canonical table.
pub fn enrich_table(table: &Table) -> Result<(Table, FeatureStats)> {
    let canonical = canonical_schema();
    if table.schema().fields() != canonical.fields() {
        return Err(PipelineError::Batch(ArrowError::SchemaError(format!(
            "expected the {}-column canonical trip schema, found {} columns",
            canonical.fields().len(),
            table.schema().fields().len()
        ))));
    }

    let schema = enriched_schema(&canonical);
    let mut stats = FeatureStats::default();
    let mut batches = Vec::with_capacity(table.batches().len());
    for batch in table.batches() {
        let (enriched, batch_stats) = enrich_batch(batch, &schema)?;
        debug!(rows = batch_stats.rows, "enriched batch");
        stats.add(batch_stats);
        batches.push(enriched);
    }
    Ok((Table::new(schema, batches), stats))
}

/// Output of the feature stage.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureReport {
    pub stats: FeatureStats,
    pub written: WriteReport,
    pub elapsed_ms: u128,
}

/// Read the staging table, derive the features, and overwrite the enriched
/// table. Runs on the session's pool.
pub fn derive(session: &Session) -> Result<FeatureReport> {
    let start = Instant::now();
    let cfg = session.config();

    let staged = table::read_table(&cfg.staging_dir)?;
    if staged.schema().fields() != canonical_schema().fields() {
        return Err(PipelineError::unreadable(
            &cfg.staging_dir,
            format!(
                "staged schema does not match the canonical trip schema ({} columns)",
                staged.schema().fields().len()
            ),
        ));
    }

    let (enriched, stats) = session.install(|| enrich_table(&staged))?;
    let written = table::write_table(&cfg.enriched_dir, &enriched, cfg.compression)?;
    Ok(FeatureReport {
        stats,
        written,
        elapsed_ms: start.elapsed().as_millis(),
    })
}

/// Feature derivation stage.
#[tracing::instrument(level = "info", skip_all, fields(staging = %session.config().staging_dir.display()))]
pub async fn run(session: &Session) -> Result<FeatureReport> {
    let session = session.clone();
    let report = tokio::task::spawn_blocking(move || derive(&session)).await??;
    info!(
        rows = report.stats.rows,
        jfk_pickups = report.stats.jfk_pickups,
        null_pickups = report.stats.null_pickups,
        negative_durations = report.stats.negative_durations,
        elapsed_ms = report.elapsed_ms as u64,
        "features complete"
    );
    Ok(report)
}
