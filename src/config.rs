use std::{fmt, path::PathBuf};

use parquet::basic::Compression;

/// Green taxi trips, September 2013.
pub const SOURCE_URL: &str =
    "https://nyc-tlc.s3.us-east-1.amazonaws.com/trip%20data/green_tripdata_2013-09.csv";
pub const STAGING_DIR: &str = "output/trip-data-parquet";
pub const ENRICHED_DIR: &str = "output/trip-data-enriched-parquet";
pub const DEFAULT_BATCH_ROWS: usize = 65_536;

/// Where the raw CSV comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    /// Fetched over HTTP(S); parsed when the fetch starts.
    Url(String),
    File(PathBuf),
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocation::Url(u) => write!(f, "{}", u),
            SourceLocation::File(p) => write!(f, "{}", p.display()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub source: SourceLocation,
    /// Canonical table, overwritten each run.
    pub staging_dir: PathBuf,
    /// Enriched table, overwritten each run.
    pub enriched_dir: PathBuf,
    /// Rows per record batch (and per Parquet part file).
    pub batch_rows: usize,
    /// Worker threads for the session pool; `None` lets rayon decide.
    pub threads: Option<usize>,
    pub compression: Compression,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: SourceLocation::Url(SOURCE_URL.to_string()),
            staging_dir: PathBuf::from(STAGING_DIR),
            enriched_dir: PathBuf::from(ENRICHED_DIR),
            batch_rows: DEFAULT_BATCH_ROWS,
            threads: None,
            compression: Compression::SNAPPY,
        }
    }
}

impl PipelineConfig {
    /// Local-file configuration writing both tables under `out_dir`.
    pub fn local(source: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        let out_dir = out_dir.into();
        Self {
            source: SourceLocation::File(source.into()),
            staging_dir: out_dir.join("trip-data-parquet"),
            enriched_dir: out_dir.join("trip-data-enriched-parquet"),
            ..Self::default()
        }
    }

    pub fn with_batch_rows(mut self, rows: usize) -> Self {
        self.batch_rows = rows.max(1);
        self
    }
}
