//! Allow-listed transformation vocabulary.
//!
//! Every method reachable from generated code lives here. Each one is a pure
//! function from a frame to a new frame; the error strings double as retry
//! feedback for the code-generation collaborator, so they name the column and
//! the constraint that was violated.

use crate::core::frame::{Column, Dtype, Frame, Value};
use crate::sandbox::lang::{Lit, MethodCall};

/// Apply one method call to a frame.
pub fn apply(frame: &Frame, call: &MethodCall) -> Result<Frame, String> {
    let args = call.args.as_slice();
    match call.name.as_str() {
        "copy" => {
            expect_arity(call, 0)?;
            Ok(frame.clone())
        }
        "drop_nulls" => drop_nulls(frame, &str_args(call)?),
        "fill_null" => {
            expect_arity(call, 2)?;
            fill_null(frame, &str_arg(call, 0)?, &args[1])
        }
        "fill_null_median" => {
            expect_arity(call, 1)?;
            fill_null_aggregate(frame, &str_arg(call, 0)?, Aggregate::Median)
        }
        "fill_null_mean" => {
            expect_arity(call, 1)?;
            fill_null_aggregate(frame, &str_arg(call, 0)?, Aggregate::Mean)
        }
        "drop_duplicates" => drop_duplicates(frame, &str_args(call)?),
        "drop_columns" => {
            if args.is_empty() {
                return Err("drop_columns requires at least one column name".to_string());
            }
            drop_columns(frame, &str_args(call)?)
        }
        "rename_column" => {
            expect_arity(call, 2)?;
            rename_column(frame, &str_arg(call, 0)?, &str_arg(call, 1)?)
        }
        "cast" => {
            expect_arity(call, 2)?;
            cast(frame, &str_arg(call, 0)?, &str_arg(call, 1)?)
        }
        "trim" => {
            expect_arity(call, 1)?;
            map_strings(frame, &str_arg(call, 0)?, "trim", |s| s.trim().to_string())
        }
        "lowercase" => {
            expect_arity(call, 1)?;
            map_strings(frame, &str_arg(call, 0)?, "lowercase", |s| s.to_lowercase())
        }
        "uppercase" => {
            expect_arity(call, 1)?;
            map_strings(frame, &str_arg(call, 0)?, "uppercase", |s| s.to_uppercase())
        }
        "filter" => {
            expect_arity(call, 3)?;
            filter(frame, &str_arg(call, 0)?, &str_arg(call, 1)?, &args[2])
        }
        "clip" => {
            expect_arity(call, 3)?;
            clip(frame, &str_arg(call, 0)?, &args[1], &args[2])
        }
        "replace" => {
            expect_arity(call, 3)?;
            replace(frame, &str_arg(call, 0)?, &args[1], &args[2])
        }
        other => Err(format!("unknown method '{other}'")),
    }
}

fn expect_arity(call: &MethodCall, arity: usize) -> Result<(), String> {
    if call.args.len() != arity {
        return Err(format!(
            "{} takes {} argument(s), got {}",
            call.name,
            arity,
            call.args.len()
        ));
    }
    Ok(())
}

fn str_arg(call: &MethodCall, index: usize) -> Result<String, String> {
    match call.args.get(index) {
        Some(Lit::Str(s)) => Ok(s.clone()),
        Some(other) => Err(format!(
            "{}: argument {} must be a string, got {}",
            call.name,
            index + 1,
            other
        )),
        None => Err(format!("{}: missing argument {}", call.name, index + 1)),
    }
}

fn str_args(call: &MethodCall) -> Result<Vec<String>, String> {
    (0..call.args.len())
        .map(|i| str_arg(call, i))
        .collect()
}

fn column_index(frame: &Frame, name: &str) -> Result<usize, String> {
    frame
        .column_index(name)
        .ok_or_else(|| format!("no such column: '{name}'"))
}

/// Drop rows with a null in any of the given columns (all columns when none
/// are given).
fn drop_nulls(frame: &Frame, cols: &[String]) -> Result<Frame, String> {
    let indices = resolve_columns(frame, cols)?;
    let mask: Vec<bool> = (0..frame.n_rows())
        .map(|row| {
            indices
                .iter()
                .all(|&i| !frame.columns()[i].values[row].is_null())
        })
        .collect();
    Ok(frame.retain_rows(&mask))
}

fn resolve_columns(frame: &Frame, cols: &[String]) -> Result<Vec<usize>, String> {
    if cols.is_empty() {
        return Ok((0..frame.n_cols()).collect());
    }
    cols.iter().map(|c| column_index(frame, c)).collect()
}

/// Coerce a literal to a cell value compatible with the column dtype.
fn value_for(dtype: Dtype, column: &str, lit: &Lit) -> Result<Value, String> {
    match (dtype, lit) {
        (_, Lit::Null) => Ok(Value::Null),
        (Dtype::Int, Lit::Int(v)) => Ok(Value::Int(*v)),
        (Dtype::Float, Lit::Int(v)) => Ok(Value::Float(*v as f64)),
        (Dtype::Float, Lit::Float(v)) => Ok(Value::Float(*v)),
        (Dtype::Bool, Lit::Bool(v)) => Ok(Value::Bool(*v)),
        (Dtype::Str, Lit::Str(v)) => Ok(Value::Str(v.clone())),
        (dtype, lit) => Err(format!(
            "value {lit} does not fit column '{column}' of type {dtype}"
        )),
    }
}

fn fill_null(frame: &Frame, col: &str, lit: &Lit) -> Result<Frame, String> {
    let index = column_index(frame, col)?;
    let column = &frame.columns()[index];
    let fill = value_for(column.dtype, col, lit)?;
    if fill.is_null() {
        return Err(format!("fill value for column '{col}' must not be null"));
    }
    let values = column
        .values
        .iter()
        .map(|v| if v.is_null() { fill.clone() } else { v.clone() })
        .collect();
    Ok(frame.with_column(index, Column::new(column.name.clone(), column.dtype, values)))
}

enum Aggregate {
    Median,
    Mean,
}

fn fill_null_aggregate(frame: &Frame, col: &str, agg: Aggregate) -> Result<Frame, String> {
    let index = column_index(frame, col)?;
    let column = &frame.columns()[index];
    if !matches!(column.dtype, Dtype::Int | Dtype::Float) {
        return Err(format!(
            "column '{col}' is {}; median/mean imputation needs a numeric column",
            column.dtype
        ));
    }
    let numerics: Vec<f64> = column.values.iter().filter_map(Value::as_f64).collect();
    if numerics.is_empty() {
        return Err(format!("column '{col}' has no values to aggregate"));
    }
    let fill = match agg {
        Aggregate::Mean => numerics.iter().sum::<f64>() / numerics.len() as f64,
        Aggregate::Median => median(&numerics),
    };

    // An integer column keeps its dtype only when the aggregate is integral;
    // otherwise the whole column is promoted to float.
    let (dtype, fill_value) = match column.dtype {
        Dtype::Int if fill.fract() == 0.0 => (Dtype::Int, Value::Int(fill as i64)),
        Dtype::Int => (Dtype::Float, Value::Float(fill)),
        _ => (Dtype::Float, Value::Float(fill)),
    };
    let values = column
        .values
        .iter()
        .map(|v| match v {
            Value::Null => fill_value.clone(),
            Value::Int(i) if dtype == Dtype::Float => Value::Float(*i as f64),
            other => other.clone(),
        })
        .collect();
    Ok(frame.with_column(index, Column::new(column.name.clone(), dtype, values)))
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Keep the first occurrence of each distinct key (selected columns, or all).
fn drop_duplicates(frame: &Frame, cols: &[String]) -> Result<Frame, String> {
    let indices = resolve_columns(frame, cols)?;
    let mut seen: Vec<Vec<&Value>> = Vec::new();
    let mask: Vec<bool> = (0..frame.n_rows())
        .map(|row| {
            let key: Vec<&Value> = indices
                .iter()
                .map(|&i| &frame.columns()[i].values[row])
                .collect();
            if seen.contains(&key) {
                false
            } else {
                seen.push(key);
                true
            }
        })
        .collect();
    Ok(frame.retain_rows(&mask))
}

fn drop_columns(frame: &Frame, cols: &[String]) -> Result<Frame, String> {
    let indices = cols
        .iter()
        .map(|c| column_index(frame, c))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(frame.without_columns(&indices))
}

fn rename_column(frame: &Frame, old: &str, new: &str) -> Result<Frame, String> {
    let index = column_index(frame, old)?;
    if old != new && frame.column(new).is_some() {
        return Err(format!("column '{new}' already exists"));
    }
    let column = &frame.columns()[index];
    Ok(frame.with_column(
        index,
        Column::new(new.to_string(), column.dtype, column.values.clone()),
    ))
}

fn cast(frame: &Frame, col: &str, dtype_name: &str) -> Result<Frame, String> {
    let index = column_index(frame, col)?;
    let dtype = Dtype::parse(dtype_name)
        .ok_or_else(|| format!("unknown dtype '{dtype_name}' (expected int, float, bool or str)"))?;
    let column = &frame.columns()[index];
    let values = column
        .values
        .iter()
        .map(|v| cast_value(v, dtype, col))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(frame.with_column(index, Column::new(column.name.clone(), dtype, values)))
}

fn cast_value(value: &Value, dtype: Dtype, col: &str) -> Result<Value, String> {
    let fail = |v: &Value| format!("cannot cast value '{v}' in column '{col}' to {dtype}");
    if value.is_null() {
        return Ok(Value::Null);
    }
    Ok(match dtype {
        Dtype::Int => match value {
            Value::Int(v) => Value::Int(*v),
            Value::Float(v) if v.is_finite() => Value::Int(*v as i64),
            Value::Bool(v) => Value::Int(i64::from(*v)),
            Value::Str(s) => Value::Int(s.trim().parse::<i64>().map_err(|_| fail(value))?),
            _ => return Err(fail(value)),
        },
        Dtype::Float => match value {
            Value::Int(v) => Value::Float(*v as f64),
            Value::Float(v) => Value::Float(*v),
            Value::Bool(v) => Value::Float(f64::from(u8::from(*v))),
            Value::Str(s) => Value::Float(s.trim().parse::<f64>().map_err(|_| fail(value))?),
            Value::Null => Value::Null,
        },
        Dtype::Bool => match value {
            Value::Bool(v) => Value::Bool(*v),
            Value::Int(v) => Value::Bool(*v != 0),
            Value::Str(s) if s.trim().eq_ignore_ascii_case("true") => Value::Bool(true),
            Value::Str(s) if s.trim().eq_ignore_ascii_case("false") => Value::Bool(false),
            _ => return Err(fail(value)),
        },
        Dtype::Str => Value::Str(value.to_string()),
    })
}

fn map_strings(
    frame: &Frame,
    col: &str,
    op: &str,
    f: impl Fn(&str) -> String,
) -> Result<Frame, String> {
    let index = column_index(frame, col)?;
    let column = &frame.columns()[index];
    if column.dtype != Dtype::Str {
        return Err(format!(
            "{op} needs a str column, but '{col}' is {}",
            column.dtype
        ));
    }
    let values = column
        .values
        .iter()
        .map(|v| match v {
            Value::Str(s) => Value::Str(f(s)),
            other => other.clone(),
        })
        .collect();
    Ok(frame.with_column(index, Column::new(column.name.clone(), column.dtype, values)))
}

/// Keep rows where `col <op> value` holds. Null cells never match.
fn filter(frame: &Frame, col: &str, op: &str, lit: &Lit) -> Result<Frame, String> {
    let index = column_index(frame, col)?;
    let column = &frame.columns()[index];
    if !matches!(op, "==" | "!=" | "<" | "<=" | ">" | ">=") {
        return Err(format!(
            "unknown comparison '{op}' (expected ==, !=, <, <=, > or >=)"
        ));
    }
    let ordering_op = !matches!(op, "==" | "!=");
    if ordering_op {
        let comparable = matches!(
            (column.dtype, lit),
            (Dtype::Int | Dtype::Float, Lit::Int(_) | Lit::Float(_)) | (Dtype::Str, Lit::Str(_))
        );
        if !comparable {
            return Err(format!(
                "cannot order-compare column '{col}' ({}) with {lit}",
                column.dtype
            ));
        }
    }

    let mask: Vec<bool> = column
        .values
        .iter()
        .map(|v| matches_filter(v, op, lit))
        .collect();
    Ok(frame.retain_rows(&mask))
}

fn matches_filter(value: &Value, op: &str, lit: &Lit) -> bool {
    if value.is_null() {
        return false;
    }
    match op {
        "==" => values_equal(value, lit),
        "!=" => !values_equal(value, lit),
        _ => {
            let ord = match (value, lit) {
                (Value::Str(a), Lit::Str(b)) => a.as_str().partial_cmp(b.as_str()),
                (v, Lit::Int(b)) => v.as_f64().and_then(|a| a.partial_cmp(&(*b as f64))),
                (v, Lit::Float(b)) => v.as_f64().and_then(|a| a.partial_cmp(b)),
                _ => None,
            };
            let Some(ord) = ord else { return false };
            match op {
                "<" => ord.is_lt(),
                "<=" => ord.is_le(),
                ">" => ord.is_gt(),
                ">=" => ord.is_ge(),
                _ => false,
            }
        }
    }
}

fn values_equal(value: &Value, lit: &Lit) -> bool {
    match (value, lit) {
        (Value::Str(a), Lit::Str(b)) => a == b,
        (Value::Bool(a), Lit::Bool(b)) => a == b,
        (v, Lit::Int(b)) => v.as_f64() == Some(*b as f64),
        (v, Lit::Float(b)) => v.as_f64() == Some(*b),
        _ => false,
    }
}

fn clip(frame: &Frame, col: &str, low: &Lit, high: &Lit) -> Result<Frame, String> {
    let index = column_index(frame, col)?;
    let column = &frame.columns()[index];
    if !matches!(column.dtype, Dtype::Int | Dtype::Float) {
        return Err(format!(
            "clip needs a numeric column, but '{col}' is {}",
            column.dtype
        ));
    }
    let bound = |lit: &Lit| -> Result<f64, String> {
        match lit {
            Lit::Int(v) => Ok(*v as f64),
            Lit::Float(v) => Ok(*v),
            other => Err(format!("clip bounds must be numeric, got {other}")),
        }
    };
    let low = bound(low)?;
    let high = bound(high)?;
    if low > high {
        return Err(format!("clip lower bound {low} exceeds upper bound {high}"));
    }

    let values = column
        .values
        .iter()
        .map(|v| match v {
            Value::Int(i) => Value::Int((*i as f64).clamp(low, high) as i64),
            Value::Float(f) => Value::Float(f.clamp(low, high)),
            other => other.clone(),
        })
        .collect();
    Ok(frame.with_column(index, Column::new(column.name.clone(), column.dtype, values)))
}

/// Replace exact matches of `from` with `to` in one column.
fn replace(frame: &Frame, col: &str, from: &Lit, to: &Lit) -> Result<Frame, String> {
    let index = column_index(frame, col)?;
    let column = &frame.columns()[index];
    if matches!(from, Lit::Null) {
        return Err("replace does not match nulls; use fill_null".to_string());
    }
    let to_value = value_for(column.dtype, col, to)?;
    let values = column
        .values
        .iter()
        .map(|v| {
            if values_equal(v, from) {
                to_value.clone()
            } else {
                v.clone()
            }
        })
        .collect();
    Ok(frame.with_column(index, Column::new(column.name.clone(), column.dtype, values)))
}
