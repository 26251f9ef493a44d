use arrow::{
    array::{ArrayRef, Float64Builder, Int32Builder, StringBuilder, TimestampMicrosecondBuilder},
    record_batch::RecordBatch,
};
use serde::Serialize;
use std::{collections::BTreeMap, sync::Arc};

use super::{date_parser, raw::CanonicalFields, utils};
use crate::error::Result;
use crate::schema::{canonical_schema, Column, ColumnType, CANONICAL_COLUMNS, TIMESTAMP_TZ};

const MAX_SAMPLES: usize = 8;

/// Fields that failed to coerce to their declared type and were nulled.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct CoercionReport {
    /// Column name → number of nulled fields.
    pub failures: BTreeMap<&'static str, u64>,
    /// A few offending values, for the logs.
    #[serde(skip)]
    pub samples: Vec<(&'static str, String)>,
}

impl CoercionReport {
    fn record(&mut self, column: &'static str, raw: &[u8]) {
        *self.failures.entry(column).or_default() += 1;
        if self.samples.len() < MAX_SAMPLES {
            self.samples
                .push((column, String::from_utf8_lossy(raw).into_owned()));
        }
    }

    pub fn merge(&mut self, other: CoercionReport) {
        for (col, n) in other.failures {
            *self.failures.entry(col).or_default() += n;
        }
        for s in other.samples {
            if self.samples.len() >= MAX_SAMPLES {
                break;
            }
            self.samples.push(s);
        }
    }

    pub fn total(&self) -> u64 {
        self.failures.values().sum()
    }
}

/// Coerce a chunk of positional rows into a canonical `RecordBatch`.
/// A field that fails to parse becomes null; the row is always kept.
pub fn convert_to_final_types(rows: &[CanonicalFields]) -> Result<(RecordBatch, CoercionReport)> {
    let mut report = CoercionReport::default();
    let mut out = Vec::with_capacity(CANONICAL_COLUMNS.len());

    for (idx, col) in CANONICAL_COLUMNS.iter().enumerate() {
        out.push(build_column(idx, col, rows, &mut report));
    }

    let batch = RecordBatch::try_new(canonical_schema(), out)?;
    Ok((batch, report))
}

fn build_column(
    idx: usize,
    col: &Column,
    rows: &[CanonicalFields],
    report: &mut CoercionReport,
) -> ArrayRef {
    match col.ty {
        ColumnType::Int => {
            let mut b = Int32Builder::with_capacity(rows.len());
            for row in rows {
                b.append_option(coerce(row.get(idx), col.name, report, utils::parse_int));
            }
            Arc::new(b.finish())
        }
        ColumnType::Double => {
            let mut b = Float64Builder::with_capacity(rows.len());
            for row in rows {
                b.append_option(coerce(row.get(idx), col.name, report, utils::parse_double));
            }
            Arc::new(b.finish())
        }
        ColumnType::Timestamp => {
            let mut b = TimestampMicrosecondBuilder::with_capacity(rows.len());
            for row in rows {
                b.append_option(coerce(
                    row.get(idx),
                    col.name,
                    report,
                    date_parser::parse_timestamp_micros,
                ));
            }
            Arc::new(b.finish().with_timezone(TIMESTAMP_TZ))
        }
        ColumnType::String => {
            let mut b = StringBuilder::with_capacity(rows.len(), rows.len() * 4);
            for row in rows {
                // stored verbatim; only a blank field is null
                match row.get(idx) {
                    Some(raw) if !raw.iter().all(u8::is_ascii_whitespace) => {
                        b.append_value(String::from_utf8_lossy(raw))
                    }
                    _ => b.append_null(),
                }
            }
            Arc::new(b.finish())
        }
    }
}

fn coerce<T>(
    raw: Option<&[u8]>,
    column: &'static str,
    report: &mut CoercionReport,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    match utils::non_blank(raw)? {
        Ok(s) => {
            let v = parse(s);
            if v.is_none() {
                report.record(column, s.as_bytes());
            }
            v
        }
        Err(bytes) => {
            report.record(column, bytes);
            None
        }
    }
}
