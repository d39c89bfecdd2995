//! Dataset quality signals consumed by the planning collaborator.
//!
//! Single-pass, stateless aggregations: missingness, duplicates, cardinality,
//! and numeric shape (spread, skew, IQR outliers). These feed the planner
//! prompt; the engine itself never branches on them.

use serde::{Deserialize, Serialize};

use crate::core::frame::{Column, Frame, Value};

/// Shape statistics for a numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericProfile {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
    /// Adjusted Fisher-Pearson coefficient; `None` for fewer than three
    /// non-null values or zero spread.
    pub skewness: Option<f64>,
    /// Values outside the 1.5 * IQR fences.
    pub outlier_count: usize,
}

/// Per-column quality signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub dtype: String,
    pub missing_count: usize,
    pub missing_pct: f64,
    pub distinct_count: usize,
    pub numeric: Option<NumericProfile>,
}

/// Aggregated signals for one dataset snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetProfile {
    pub row_count: usize,
    pub column_count: usize,
    pub empty_dataset: bool,
    pub duplicate_row_count: usize,
    pub total_missing: usize,
    pub columns: Vec<ColumnProfile>,
}

/// Profile a frame. Pure; safe on empty frames.
pub fn profile_frame(frame: &Frame) -> DatasetProfile {
    let row_count = frame.n_rows();
    let columns = frame
        .columns()
        .iter()
        .map(|col| profile_column(col, row_count))
        .collect();

    DatasetProfile {
        row_count,
        column_count: frame.n_cols(),
        empty_dataset: row_count == 0 || frame.n_cols() == 0,
        duplicate_row_count: duplicate_rows(frame),
        total_missing: frame.null_total(),
        columns,
    }
}

fn profile_column(col: &Column, row_count: usize) -> ColumnProfile {
    let missing_count = col.null_count();
    let missing_pct = round2(missing_count as f64 / row_count.max(1) as f64 * 100.0);

    let mut distinct: Vec<&Value> = Vec::new();
    for value in &col.values {
        if !value.is_null() && !distinct.contains(&value) {
            distinct.push(value);
        }
    }

    let numerics: Vec<f64> = col.values.iter().filter_map(Value::as_f64).collect();
    let numeric = if numerics.is_empty() {
        None
    } else {
        Some(numeric_profile(&numerics))
    };

    ColumnProfile {
        name: col.name.clone(),
        dtype: col.dtype.to_string(),
        missing_count,
        missing_pct,
        distinct_count: distinct.len(),
        numeric,
    }
}

fn numeric_profile(values: &[f64]) -> NumericProfile {
    let n = values.len() as f64;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    NumericProfile {
        min,
        max,
        mean,
        std_dev,
        skewness: skewness(values, mean),
        outlier_count: iqr_outliers(values),
    }
}

/// Adjusted Fisher-Pearson skewness, matching the common sample estimator.
fn skewness(values: &[f64], mean: f64) -> Option<f64> {
    let n = values.len() as f64;
    if values.len() < 3 {
        return None;
    }
    let m2 = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let m3 = values.iter().map(|v| (v - mean).powi(3)).sum::<f64>() / n;
    if m2 == 0.0 {
        return None;
    }
    let g1 = m3 / m2.powf(1.5);
    Some(g1 * (n * (n - 1.0)).sqrt() / (n - 2.0))
}

fn iqr_outliers(values: &[f64]) -> usize {
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let q1 = quantile(&sorted, 0.25);
    let q3 = quantile(&sorted, 0.75);
    let iqr = q3 - q1;
    let lower = q1 - 1.5 * iqr;
    let upper = q3 + 1.5 * iqr;
    values.iter().filter(|v| **v < lower || **v > upper).count()
}

/// Linear-interpolation quantile over a sorted, non-empty slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

fn duplicate_rows(frame: &Frame) -> usize {
    if frame.n_rows() == 0 || frame.n_cols() == 0 {
        return 0;
    }
    let mut seen: Vec<Vec<&Value>> = Vec::new();
    let mut duplicates = 0;
    for i in 0..frame.n_rows() {
        let row = frame.row(i);
        if seen.contains(&row) {
            duplicates += 1;
        } else {
            seen.push(row);
        }
    }
    duplicates
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
