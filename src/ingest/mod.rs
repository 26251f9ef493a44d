// src/ingest/mod.rs
pub mod convert;
pub mod date_parser;
pub mod raw;
pub mod utils;

use rayon::prelude::*;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::fetch;
use crate::schema::{canonical_schema, RAW_FIELD_COUNT};
use crate::session::Session;
use crate::table::{self, Table, WriteReport};

pub use convert::CoercionReport;
pub use raw::{CanonicalFields, RawRecord, RowShape};

/// Output of the ingest stage.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub source: String,
    pub shape: RowShape,
    pub coercion: CoercionReport,
    pub written: WriteReport,
    pub elapsed_ms: u128,
}

/// A normalized canonical table plus what was observed while building it.
#[derive(Debug)]
pub struct Normalized {
    pub table: Table,
    pub shape: RowShape,
    pub coercion: CoercionReport,
}

/// Turn raw CSV bytes into the canonical 20-column table.
///
/// - The first physical line is discarded, never used as a header.
/// - Every row is read into 21 positional slots; slot 20 is dropped.
/// - Slot `i` becomes canonical column `i`, coerced to its declared type;
///   fields that fail to coerce are null, rows are never dropped.
///
/// Chunks are coerced in parallel on the current rayon pool and keep input
/// order.
pub fn normalize(data: &[u8], location: &str, batch_rows: usize) -> Result<Normalized> {
    let (header, body) = raw::split_header_line(data);
    let header_width = raw::header_width(header);
    debug!(header_width, "discarded header line");

    let mut chunks = raw::RawChunks::new(body, header_width, batch_rows);
    let mut raw_chunks = Vec::new();
    for chunk in chunks.by_ref() {
        raw_chunks.push(chunk.map_err(|e| PipelineError::SourceMalformed {
            location: location.to_string(),
            source: e,
        })?);
    }
    let shape = chunks.into_shape();

    let converted: Vec<_> = raw_chunks
        .into_par_iter()
        .map(|chunk| {
            let fields: Vec<CanonicalFields> = chunk
                .into_iter()
                .map(RawRecord::drop_artifact_field)
                .collect();
            convert::convert_to_final_types(&fields)
        })
        .collect::<Result<_>>()?;

    let mut coercion = CoercionReport::default();
    let mut batches = Vec::with_capacity(converted.len());
    for (batch, report) in converted {
        coercion.merge(report);
        batches.push(batch);
    }

    Ok(Normalized {
        table: Table::new(canonical_schema(), batches),
        shape,
        coercion,
    })
}

fn log_observations(shape: &RowShape, coercion: &CoercionReport) {
    if shape.header_width != RAW_FIELD_COUNT {
        info!(
            header_width = shape.header_width,
            row_width = RAW_FIELD_COUNT,
            "header width disagrees with positional layout; header ignored"
        );
    }
    let unexpected = shape.unexpected_width_rows();
    if unexpected > 0 {
        warn!(rows = unexpected, widths = ?shape.widths, "rows with unexpected field count");
    }
    for (column, n) in &coercion.failures {
        warn!(column, nulled = n, "fields failed type coercion");
    }
    for (column, value) in &coercion.samples {
        debug!(column, value = %value, "coercion failure sample");
    }
}

/// Normalize already-fetched bytes and persist the canonical table at the
/// staging path. Runs on the session's pool.
pub fn ingest_bytes(session: &Session, data: &[u8]) -> Result<IngestReport> {
    let start = Instant::now();
    let cfg = session.config();
    let location = cfg.source.to_string();

    let normalized = session.install(|| normalize(data, &location, cfg.batch_rows))?;
    log_observations(&normalized.shape, &normalized.coercion);

    let written = table::write_table(&cfg.staging_dir, &normalized.table, cfg.compression)?;
    Ok(IngestReport {
        source: location,
        shape: normalized.shape,
        coercion: normalized.coercion,
        written,
        elapsed_ms: start.elapsed().as_millis(),
    })
}

/// Ingest/normalize stage: fetch the source, normalize it, and overwrite the
/// staging table.
#[tracing::instrument(level = "info", skip_all, fields(source = %session.config().source))]
pub async fn run(session: &Session) -> Result<IngestReport> {
    let data = fetch::fetch_source(session.client(), &session.config().source).await?;

    let session = session.clone();
    let report = tokio::task::spawn_blocking(move || ingest_bytes(&session, &data)).await??;
    info!(
        rows = report.written.rows,
        nulled = report.coercion.total(),
        elapsed_ms = report.elapsed_ms as u64,
        "ingest complete"
    );
    Ok(report)
}
