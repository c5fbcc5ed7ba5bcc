use std::{fs::File, path::Path, sync::Arc};

use anyhow::{Context, Result};
use polars::{frame::DataFrame, io::SerReader, prelude::{CsvReadOptions, DataType, Field, Schema}};

/// Reads a CSV file from `path`, forcing `text_columns` to be read as strings
/// so zero-padded codes keep their leading zeros.
pub(crate) fn read_csv(path: &Path, text_columns: &[&str]) -> Result<DataFrame> {
    let file = File::open(path)
        .with_context(|| format!("[io::csv::read] Failed to open CSV file: {}", path.display()))?;
    let schema = Schema::from_iter(
        text_columns.iter().map(|&name| Field::new(name.into(), DataType::String))
    );
    CsvReadOptions::default()
        .with_has_header(true)
        .with_schema_overwrite(Some(Arc::new(schema)))
        .into_reader_with_file_handle(file)
        .finish()
        .with_context(|| format!("[io::csv::read] Failed to read CSV from {}", path.display()))
}

/// Get a column as strings; numeric columns are cast and nulls are kept.
pub(crate) fn text_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df.column(name)
        .with_context(|| format!("[io::csv::read] Missing column: {name}"))?
        .cast(&DataType::String)?;
    Ok(column.str()?.into_iter().map(|s| s.map(str::to_string)).collect())
}

/// Get a column as floats; values that cannot be parsed become null.
pub(crate) fn float_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df.column(name)
        .with_context(|| format!("[io::csv::read] Missing column: {name}"))?
        .cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().collect())
}
