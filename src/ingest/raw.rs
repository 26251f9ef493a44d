// src/ingest/raw.rs

use csv::{ByteRecord, ReaderBuilder};
use std::collections::BTreeMap;

use crate::schema::{ARTIFACT_FIELD_INDEX, CANONICAL_FIELD_COUNT, RAW_FIELD_COUNT};

/// Split off the first physical line. The source's header advertises a
/// different column count than its data rows, so it is discarded rather
/// than trusted. Returns `(header, body)`.
pub fn split_header_line(data: &[u8]) -> (&[u8], &[u8]) {
    match data.iter().position(|&b| b == b'\n') {
        Some(nl) => (&data[..nl], &data[nl + 1..]),
        None => (data, &data[data.len()..]),
    }
}

/// Number of comma-separated fields the discarded header claims.
pub fn header_width(header: &[u8]) -> usize {
    let trimmed = trim_line_end(header);
    if trimmed.is_empty() {
        0
    } else {
        trimmed.iter().filter(|&&b| b == b',').count() + 1
    }
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && matches!(line[end - 1], b'\r' | b'\n') {
        end -= 1;
    }
    &line[..end]
}

/// One data row, read into exactly `RAW_FIELD_COUNT` positional slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Width of the row as it appeared in the file.
    pub width: usize,
    slots: Vec<Option<Vec<u8>>>,
}

impl RawRecord {
    /// Assign positional slots `0..RAW_FIELD_COUNT`. Missing slots stay
    /// empty; fields beyond the last slot are ignored.
    pub fn from_byte_record(rec: &ByteRecord) -> Self {
        let mut slots = Vec::with_capacity(RAW_FIELD_COUNT);
        for i in 0..RAW_FIELD_COUNT {
            slots.push(rec.get(i).map(|f| f.to_vec()));
        }
        RawRecord {
            width: rec.len(),
            slots,
        }
    }

    pub fn slot(&self, idx: usize) -> Option<&[u8]> {
        self.slots.get(idx).and_then(|s| s.as_deref())
    }

    /// Drop the artifact field (index 20) and keep the first 20 slots in
    /// order. Slot `i` of the result is canonical column `i`.
    pub fn drop_artifact_field(self) -> CanonicalFields {
        let mut slots = self.slots;
        slots.truncate(ARTIFACT_FIELD_INDEX);
        CanonicalFields { slots }
    }
}

/// The 20 retained raw fields, positionally aligned with
/// [`crate::schema::CANONICAL_COLUMNS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalFields {
    slots: Vec<Option<Vec<u8>>>,
}

impl CanonicalFields {
    pub fn get(&self, idx: usize) -> Option<&[u8]> {
        self.slots.get(idx).and_then(|s| s.as_deref())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Shape statistics for the rows read from one source.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RowShape {
    pub header_width: usize,
    pub rows: u64,
    /// Raw row width → number of rows with that width.
    pub widths: BTreeMap<usize, u64>,
}

impl RowShape {
    fn observe(&mut self, width: usize) {
        self.rows += 1;
        *self.widths.entry(width).or_default() += 1;
    }

    /// Rows whose width is neither the canonical width nor canonical + artifact.
    pub fn unexpected_width_rows(&self) -> u64 {
        self.widths
            .iter()
            .filter(|(w, _)| **w != CANONICAL_FIELD_COUNT && **w != RAW_FIELD_COUNT)
            .map(|(_, n)| *n)
            .sum()
    }
}

/// Reads the body (everything after the discarded header) as headerless,
/// flexible-width CSV, yielding chunks of at most `chunk_rows` records.
pub struct RawChunks<'a> {
    reader: csv::Reader<&'a [u8]>,
    record: ByteRecord,
    chunk_rows: usize,
    shape: RowShape,
    done: bool,
}

impl<'a> RawChunks<'a> {
    pub fn new(body: &'a [u8], header_width: usize, chunk_rows: usize) -> Self {
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // rows carry 20 or 21 fields
            .from_reader(body);
        RawChunks {
            reader,
            record: ByteRecord::new(),
            chunk_rows: chunk_rows.max(1),
            shape: RowShape {
                header_width,
                ..RowShape::default()
            },
            done: false,
        }
    }

    pub fn shape(&self) -> &RowShape {
        &self.shape
    }

    pub fn into_shape(self) -> RowShape {
        self.shape
    }
}

impl Iterator for RawChunks<'_> {
    type Item = Result<Vec<RawRecord>, csv::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut chunk = Vec::with_capacity(self.chunk_rows.min(4096));
        while chunk.len() < self.chunk_rows {
            match self.reader.read_byte_record(&mut self.record) {
                Ok(true) => {
                    self.shape.observe(self.record.len());
                    chunk.push(RawRecord::from_byte_record(&self.record));
                }
                Ok(false) => {
                    self.done = true;
                    break;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        if chunk.is_empty() {
            None
        } else {
            Some(Ok(chunk))
        }
    }
}
