use anyhow::{Context, Result};
use arrow::array::Array;
use parquet::file::metadata::RowGroupMetaData;
use parquet::file::reader::{FileReader, SerializedFileReader};
use std::{env, fs::File, path::Path, process::exit};
use tripfeatures::table::{part_files, read_table};

fn main() {
    // Expect exactly one CLI argument: a table directory.
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <TABLE_DIR>", args[0]);
        exit(1);
    }
    if let Err(e) = inspect_table(Path::new(&args[1])) {
        eprintln!("Error: {:#}", e);
        exit(1);
    }
}

/// Print the schema, part layout and per-column null counts of a table
/// written by the pipeline.
fn inspect_table(dir: &Path) -> Result<()> {
    let table = read_table(dir)?;
    let schema = table.schema();

    println!("=== Table: {} ===", dir.display());
    println!("Rows:    {}", table.num_rows());
    println!("Columns: {}", schema.fields().len());
    println!();

    println!("=== Schema ===");
    for (idx, field) in schema.fields().iter().enumerate() {
        println!(
            "{:>3} {:<28} {:<32} {}",
            idx,
            field.name(),
            field.data_type().to_string(),
            if field.is_nullable() { "nullable" } else { "required" }
        );
    }
    println!();

    println!("=== Parts ===");
    for part in part_files(dir)? {
        let file = File::open(&part).with_context(|| format!("opening {}", part.display()))?;
        let reader = SerializedFileReader::new(file)
            .with_context(|| format!("reading footer of {}", part.display()))?;
        let meta = reader.metadata();
        let on_disk = std::fs::metadata(&part)?.len();
        println!(
            "- {} | rows: {} | row groups: {} | {} bytes on disk",
            part.file_name().map_or_else(|| part.display().to_string(), |n| n.to_string_lossy().into_owned()),
            meta.file_metadata().num_rows(),
            meta.num_row_groups(),
            on_disk
        );
        for rg_idx in 0..meta.num_row_groups() {
            print_row_group(rg_idx, meta.row_group(rg_idx));
        }
    }
    println!();

    println!("=== Null counts ===");
    let mut nulls = vec![0usize; schema.fields().len()];
    for batch in table.batches() {
        for (idx, column) in batch.columns().iter().enumerate() {
            nulls[idx] += column.null_count();
        }
    }
    for (field, n) in schema.fields().iter().zip(nulls) {
        if n > 0 {
            println!("- {:<28} {}", field.name(), n);
        }
    }
    Ok(())
}

fn print_row_group(idx: usize, rg: &RowGroupMetaData) {
    let compressed: i64 = rg.columns().iter().map(|c| c.compressed_size()).sum();
    let codec = rg
        .columns()
        .first()
        .map_or("<none>".to_string(), |c| format!("{:?}", c.compression()));
    println!(
        "    rg {}: {} rows, {} bytes uncompressed, {} bytes compressed, {}",
        idx,
        rg.num_rows(),
        rg.total_byte_size(),
        compressed,
        codec
    );
}
