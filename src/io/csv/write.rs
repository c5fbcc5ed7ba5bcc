use std::{fs::File, io::Write, path::Path};

use anyhow::{Context, Result};
use polars::{frame::DataFrame, io::SerWriter, prelude::CsvWriter};

/// Write a DataFrame as CSV to any writer.
fn write_csv_to<W: Write>(df: &mut DataFrame, writer: W) -> Result<()> {
    CsvWriter::new(writer)
        .finish(df)
        .context("[io::csv::write] Failed to write CSV")
}

/// Write a DataFrame to a CSV file.
pub(crate) fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("[io::csv::write] Failed to create CSV file: {}", path.display()))?;
    write_csv_to(df, file)
        .with_context(|| format!("[io::csv::write] Failed to write CSV to {}", path.display()))
}

/// Encode a DataFrame as CSV bytes.
pub(crate) fn csv_bytes(df: &mut DataFrame) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write_csv_to(df, &mut out)?;
    Ok(out)
}
