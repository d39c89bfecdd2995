//! In-memory columnar table: the dataset snapshot every transformation
//! consumes and produces.
//!
//! Frames are immutable by convention: no operation in this crate mutates a
//! frame in place. The sandbox and the cleaning ops always build a new frame,
//! and `ExecutionState` replaces its snapshot wholesale on acceptance.

use std::fmt;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

/// Declared element type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    Int,
    Float,
    Bool,
    Str,
}

impl Dtype {
    pub fn as_str(self) -> &'static str {
        match self {
            Dtype::Int => "int",
            Dtype::Float => "float",
            Dtype::Bool => "bool",
            Dtype::Str => "str",
        }
    }

    /// Parse a dtype name as used by the `cast` vocabulary.
    pub fn parse(name: &str) -> Option<Dtype> {
        match name {
            "int" => Some(Dtype::Int),
            "float" => Some(Dtype::Float),
            "bool" => Some(Dtype::Bool),
            "str" => Some(Dtype::Str),
            _ => None,
        }
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single cell value. `Null` is allowed in any column regardless of dtype.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view used by comparisons, clipping, and imputation.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }
}

// Manual equality so that two NaN cells compare equal. Structural frame
// equality drives no-op detection, which must be stable for any data.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Str(v) => f.write_str(v),
        }
    }
}

/// Named, typed column with one value per row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub dtype: Dtype,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, dtype: Dtype, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            dtype,
            values,
        }
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }
}

/// Ordered set of named columns with equal lengths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    columns: Vec<Column>,
}

impl Frame {
    /// Build a frame, enforcing unique column names and equal column lengths.
    pub fn new(columns: Vec<Column>) -> Result<Frame> {
        if let Some(first) = columns.first() {
            let len = first.values.len();
            for col in &columns {
                if col.values.len() != len {
                    return Err(anyhow!(
                        "column '{}' has {} rows, expected {}",
                        col.name,
                        col.values.len(),
                        len
                    ));
                }
            }
        }
        for (i, col) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == col.name) {
                return Err(anyhow!("duplicate column name '{}'", col.name));
            }
        }
        Ok(Frame { columns })
    }

    /// A frame with no columns and no rows.
    pub fn empty() -> Frame {
        Frame { columns: vec![] }
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Total null cells across all columns.
    pub fn null_total(&self) -> usize {
        self.columns.iter().map(Column::null_count).sum()
    }

    /// One row as a vector of value references, in column order.
    pub fn row(&self, index: usize) -> Vec<&Value> {
        self.columns.iter().map(|c| &c.values[index]).collect()
    }

    /// New frame keeping only rows where `mask` is true.
    ///
    /// `mask` must have one entry per row.
    pub fn retain_rows(&self, mask: &[bool]) -> Frame {
        debug_assert_eq!(mask.len(), self.n_rows());
        let columns = self
            .columns
            .iter()
            .map(|col| {
                let values = col
                    .values
                    .iter()
                    .zip(mask)
                    .filter(|(_, keep)| **keep)
                    .map(|(v, _)| v.clone())
                    .collect();
                Column::new(col.name.clone(), col.dtype, values)
            })
            .collect();
        Frame { columns }
    }

    /// New frame with one column's values replaced.
    ///
    /// The replacement must keep the row count; dtype may change (casts).
    pub fn with_column(&self, index: usize, column: Column) -> Frame {
        debug_assert_eq!(column.values.len(), self.n_rows());
        let mut columns = self.columns.clone();
        columns[index] = column;
        Frame { columns }
    }

    /// New frame without the columns at the given indices.
    pub fn without_columns(&self, indices: &[usize]) -> Frame {
        let columns = self
            .columns
            .iter()
            .enumerate()
            .filter(|(i, _)| !indices.contains(i))
            .map(|(_, c)| c.clone())
            .collect();
        Frame { columns }
    }
}
