//! CSV loading and saving with column type inference.
//!
//! Inference is per column over the non-empty cells, narrowest type first:
//! int, then float, then bool, then str. Empty cells become nulls and never
//! influence the inferred type.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing::debug;

use crate::core::frame::{Column, Dtype, Frame, Value};

/// Read a CSV file with a header row into a typed frame.
pub fn read_csv(path: &Path) -> Result<Frame> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("open {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("read header of {}", path.display()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for (row, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("read row {} of {}", row + 1, path.display()))?;
        if record.len() != headers.len() {
            return Err(anyhow!(
                "row {} of {} has {} fields, expected {}",
                row + 1,
                path.display(),
                record.len(),
                headers.len()
            ));
        }
        for (i, field) in record.iter().enumerate() {
            cells[i].push(field.to_string());
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, raw)| infer_column(name, &raw))
        .collect();
    let frame = Frame::new(columns).with_context(|| format!("load {}", path.display()))?;
    debug!(rows = frame.n_rows(), cols = frame.n_cols(), "loaded dataset");
    Ok(frame)
}

/// Write a frame back out as CSV. Nulls become empty cells.
pub fn write_csv(path: &Path, frame: &Frame) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("create {}", path.display()))?;

    writer
        .write_record(frame.column_names())
        .context("write header")?;
    for i in 0..frame.n_rows() {
        let record: Vec<String> = frame.row(i).iter().map(|v| v.to_string()).collect();
        writer
            .write_record(&record)
            .with_context(|| format!("write row {i}"))?;
    }
    writer
        .flush()
        .with_context(|| format!("flush {}", path.display()))?;
    Ok(())
}

fn infer_column(name: String, raw: &[String]) -> Column {
    let dtype = infer_dtype(raw);
    let values = raw
        .iter()
        .map(|cell| parse_cell(cell, dtype))
        .collect();
    Column::new(name, dtype, values)
}

fn infer_dtype(raw: &[String]) -> Dtype {
    let non_empty: Vec<&str> = raw
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect();
    // All-empty columns read back as str.
    if non_empty.is_empty() {
        return Dtype::Str;
    }
    if non_empty.iter().all(|c| c.parse::<i64>().is_ok()) {
        return Dtype::Int;
    }
    if non_empty.iter().all(|c| c.parse::<f64>().is_ok()) {
        return Dtype::Float;
    }
    if non_empty
        .iter()
        .all(|c| c.eq_ignore_ascii_case("true") || c.eq_ignore_ascii_case("false"))
    {
        return Dtype::Bool;
    }
    Dtype::Str
}

fn parse_cell(cell: &str, dtype: Dtype) -> Value {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    match dtype {
        // Inference guarantees these parses succeed for non-empty cells.
        Dtype::Int => trimmed.parse::<i64>().map_or(Value::Null, Value::Int),
        Dtype::Float => trimmed.parse::<f64>().map_or(Value::Null, Value::Float),
        Dtype::Bool => Value::Bool(trimmed.eq_ignore_ascii_case("true")),
        Dtype::Str => Value::Str(cell.to_string()),
    }
}
