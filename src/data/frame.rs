//! Lightweight named-column table for modeling datasets.
//!
//! Row numbers are **1-based** throughout the stage library: the validation
//! partition is expressed as 1-based row numbers and sliced back here. Column
//! lookups fail with a `Data` error naming the missing column so the caller
//! sees which configured selector did not match the dataset.

use std::collections::BTreeSet;

use crate::error::StageError;

/// A single dataset value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Num(f64),
    Text(String),
    Missing,
}

impl Cell {
    /// Numeric value, if this cell holds one.
    pub fn as_num(&self) -> Option<f64> {
        match self {
            Cell::Num(v) => Some(*v),
            Cell::Text(_) | Cell::Missing => None,
        }
    }

    /// Canonical string form, used for identifier matching and for
    /// stratification keys.
    pub fn key(&self) -> String {
        match self {
            Cell::Num(v) => format!("{v}"),
            Cell::Text(s) => s.clone(),
            Cell::Missing => String::new(),
        }
    }
}

/// Named-column, row-major table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataFrame {
    names: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl DataFrame {
    pub fn new(names: Vec<String>) -> Self {
        DataFrame {
            names,
            rows: Vec::new(),
        }
    }

    /// Append a row; its arity must match the column count.
    pub fn push_row(&mut self, cells: Vec<Cell>) -> Result<(), StageError> {
        if cells.len() != self.names.len() {
            return Err(StageError::data(format!(
                "Row has {} values but the frame has {} columns.",
                cells.len(),
                self.names.len()
            )));
        }
        self.rows.push(cells);
        Ok(())
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Column index, or a `Data` error naming the missing column.
    pub fn require_column(&self, name: &str) -> Result<usize, StageError> {
        self.column_index(name)
            .ok_or_else(|| StageError::data(format!("Missing required column: `{name}`")))
    }

    /// Cell at 1-based `row_no` and column index.
    pub fn cell(&self, row_no: usize, col: usize) -> Option<&Cell> {
        if row_no == 0 {
            return None;
        }
        self.rows.get(row_no - 1).and_then(|row| row.get(col))
    }

    /// Numeric value at 1-based `row_no` in the named column.
    pub fn num(&self, row_no: usize, name: &str) -> Result<f64, StageError> {
        let col = self.require_column(name)?;
        let cell = self.cell(row_no, col).ok_or_else(|| {
            StageError::data(format!("Row {row_no} is out of range for a {}-row frame.", self.n_rows()))
        })?;
        cell.as_num().ok_or_else(|| {
            StageError::data(format!(
                "Row {row_no} has no usable numeric value in column `{name}`."
            ))
        })
    }

    /// Canonical string value at 1-based `row_no` in the named column.
    pub fn value_key(&self, row_no: usize, name: &str) -> Result<String, StageError> {
        let col = self.require_column(name)?;
        let cell = self.cell(row_no, col).ok_or_else(|| {
            StageError::data(format!("Row {row_no} is out of range for a {}-row frame.", self.n_rows()))
        })?;
        Ok(cell.key())
    }

    /// New frame containing exactly the given 1-based rows, in ascending order.
    pub fn slice_rows(&self, rows: &BTreeSet<usize>) -> Result<DataFrame, StageError> {
        let mut out = DataFrame::new(self.names.clone());
        for &row_no in rows {
            if row_no == 0 || row_no > self.n_rows() {
                return Err(StageError::data(format!(
                    "Row {row_no} is out of range for a {}-row frame.",
                    self.n_rows()
                )));
            }
            out.rows.push(self.rows[row_no - 1].clone());
        }
        Ok(out)
    }
}
