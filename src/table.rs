// src/table.rs

use arrow::{compute::concat_batches, datatypes::SchemaRef, record_batch::RecordBatch};
use glob::{glob, Pattern};
use parquet::{
    arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter},
    basic::Compression,
    file::properties::WriterProperties,
};
use serde::Serialize;
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

use crate::config::DEFAULT_BATCH_ROWS;
use crate::error::{BoxError, PipelineError, Result};

/// An immutable in-memory table: one schema, ordered batches.
#[derive(Debug, Clone)]
pub struct Table {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl Table {
    pub fn new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Self {
        Self { schema, batches }
    }

    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(|b| b.num_rows()).sum()
    }

    /// All rows in a single batch.
    pub fn concat(&self) -> Result<RecordBatch> {
        Ok(concat_batches(&self.schema, &self.batches)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteReport {
    pub path: PathBuf,
    pub parts: usize,
    pub rows: u64,
    pub bytes: u64,
}

fn part_name(idx: usize) -> String {
    format!("part-{:05}.parquet", idx)
}

/// Write `table` as a directory of Parquet part files at `dir`, replacing
/// whatever was there.
///
/// Parts are written into a temporary sibling directory first; the old table
/// is then moved aside, the new one renamed into place, and the old one
/// deleted. A crash between the two renames can leave `dir` absent.
#[tracing::instrument(level = "info", skip_all, fields(path = %dir.display()))]
pub fn write_table(dir: &Path, table: &Table, compression: Compression) -> Result<WriteReport> {
    let parent = match dir.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|e| PipelineError::write_failure(dir, e))?;

    let tmp = tempfile::Builder::new()
        .prefix(".tripfeatures-")
        .tempdir_in(&parent)
        .map_err(|e| PipelineError::write_failure(dir, e))?;

    let props = WriterProperties::builder()
        .set_compression(compression)
        .build();

    let mut bytes = 0u64;
    if table.batches.is_empty() {
        // an empty table still carries its schema
        let path = tmp.path().join(part_name(0));
        bytes += write_part(&path, &table.schema, None, &props)
            .map_err(|e| PipelineError::write_failure(dir, e))?;
    }
    for (idx, batch) in table.batches.iter().enumerate() {
        let path = tmp.path().join(part_name(idx));
        bytes += write_part(&path, &table.schema, Some(batch), &props)
            .map_err(|e| PipelineError::write_failure(dir, e))?;
        debug!(part = idx, rows = batch.num_rows(), "wrote part");
    }

    let staged = tmp.keep();
    swap_into_place(&staged, dir, &parent).map_err(|e| PipelineError::write_failure(dir, e))?;

    let report = WriteReport {
        path: dir.to_path_buf(),
        parts: table.batches.len().max(1),
        rows: table.num_rows() as u64,
        bytes,
    };
    info!(rows = report.rows, parts = report.parts, bytes = report.bytes, "table written");
    Ok(report)
}

fn write_part(
    path: &Path,
    schema: &SchemaRef,
    batch: Option<&RecordBatch>,
    props: &WriterProperties,
) -> std::result::Result<u64, BoxError> {
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props.clone()))?;
    if let Some(batch) = batch {
        writer.write(batch)?;
    }
    writer.close()?;
    Ok(fs::metadata(path)?.len())
}

fn swap_into_place(staged: &Path, dir: &Path, parent: &Path) -> std::io::Result<()> {
    if fs::symlink_metadata(dir).is_err() {
        return fs::rename(staged, dir);
    }

    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "table".to_string());
    let backup = parent.join(format!(".{}.old-{}", name, std::process::id()));
    if fs::symlink_metadata(&backup).is_ok() {
        remove_path(&backup)?;
    }

    fs::rename(dir, &backup)?;
    if let Err(e) = fs::rename(staged, dir) {
        // put the previous table back before reporting
        let _ = fs::rename(&backup, dir);
        let _ = fs::remove_dir_all(staged);
        return Err(e);
    }
    if let Err(e) = remove_path(&backup) {
        warn!(backup = %backup.display(), "failed to remove previous table: {}", e);
    }
    Ok(())
}

fn remove_path(path: &Path) -> std::io::Result<()> {
    if fs::symlink_metadata(path)?.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Part files of the table at `dir`, in name order.
pub fn part_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/part-*.parquet", Pattern::escape(&dir.to_string_lossy()));
    let entries = glob(&pattern).map_err(|e| PipelineError::unreadable(dir, e))?;
    let mut parts = Vec::new();
    for entry in entries {
        parts.push(entry.map_err(|e| PipelineError::unreadable(dir, e))?);
    }
    parts.sort();
    Ok(parts)
}

/// Read the table at `dir` back into memory.
#[tracing::instrument(level = "info", skip_all, fields(path = %dir.display()))]
pub fn read_table(dir: &Path) -> Result<Table> {
    if !dir.is_dir() {
        return Err(PipelineError::StageInputMissing {
            path: dir.to_path_buf(),
        });
    }
    let parts = part_files(dir)?;
    if parts.is_empty() {
        return Err(PipelineError::StageInputMissing {
            path: dir.to_path_buf(),
        });
    }

    let mut schema: Option<SchemaRef> = None;
    let mut batches = Vec::new();
    for part in &parts {
        let file = File::open(part).map_err(|e| PipelineError::unreadable(part, e))?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)
            .map_err(|e| PipelineError::unreadable(part, e))?;

        let part_schema = builder.schema().clone();
        let expected = schema.get_or_insert_with(|| part_schema.clone());
        if expected.fields() != part_schema.fields() {
            return Err(PipelineError::unreadable(
                part,
                "part schema differs from the first part",
            ));
        }

        let reader = builder
            .with_batch_size(DEFAULT_BATCH_ROWS)
            .build()
            .map_err(|e| PipelineError::unreadable(part, e))?;
        for batch in reader {
            let batch = batch.map_err(|e| PipelineError::unreadable(part, e))?;
            if batch.num_rows() > 0 {
                batches.push(batch);
            }
        }
    }

    let schema = schema.ok_or_else(|| PipelineError::StageInputMissing {
        path: dir.to_path_buf(),
    })?;
    let table = Table::new(schema, batches);
    info!(rows = table.num_rows(), parts = parts.len(), "table read");
    Ok(table)
}
