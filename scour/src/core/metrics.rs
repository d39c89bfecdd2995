//! Impact metrics comparing a dataset before and after one cleaning step.

use serde::{Deserialize, Serialize};

use crate::core::frame::Frame;

/// Quantitative delta between two dataset snapshots.
///
/// The acceptance policy reads `row_drop_pct`; everything else is recorded
/// for the audit history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepMetrics {
    pub rows_before: usize,
    pub rows_after: usize,
    /// Signed: negative when the transformation added rows.
    pub rows_dropped: i64,
    /// Percentage of `rows_before` dropped, rounded to two decimals.
    /// Computed against `max(rows_before, 1)` so empty inputs are safe.
    pub row_drop_pct: f64,
    pub nulls_before: usize,
    pub nulls_after: usize,
    /// Signed: negative when nulls were removed.
    pub nulls_delta: i64,
    pub columns_before: usize,
    pub columns_after: usize,
}

/// Compare two snapshots. Pure; never fails, including on empty frames.
pub fn evaluate_step(before: &Frame, after: &Frame) -> StepMetrics {
    let rows_before = before.n_rows();
    let rows_after = after.n_rows();
    let rows_dropped = rows_before as i64 - rows_after as i64;
    let row_drop_pct = round2(rows_dropped as f64 / rows_before.max(1) as f64 * 100.0);

    let nulls_before = before.null_total();
    let nulls_after = after.null_total();

    StepMetrics {
        rows_before,
        rows_after,
        rows_dropped,
        row_drop_pct,
        nulls_before,
        nulls_after,
        nulls_delta: nulls_after as i64 - nulls_before as i64,
        columns_before: before.n_cols(),
        columns_after: after.n_cols(),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
