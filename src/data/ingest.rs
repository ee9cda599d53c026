//! CSV ingest for modeling datasets.
//!
//! This module turns a heterogeneous modeling CSV into a [`DataFrame`] that is
//! safe to partition and score.
//!
//! Design goals:
//! - **Lenient cells, strict frames**: every field is classified as numeric,
//!   text, or missing; rows with the wrong arity are skipped, not fatal
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior** (no hidden randomness)
//! - **Separation of concerns**: no partitioning or scoring logic here

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::data::frame::{Cell, DataFrame};
use crate::error::StageError;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: the frame plus what was skipped along the way.
#[derive(Debug, Clone)]
pub struct IngestedFrame {
    pub frame: DataFrame,
    pub rows_read: usize,
    pub rows_used: usize,
    pub row_errors: Vec<RowError>,
}

/// Load a modeling dataset CSV from disk.
pub fn load_modeling_csv(path: &Path) -> Result<IngestedFrame, StageError> {
    let file = File::open(path).map_err(|e| {
        StageError::data(format!("Failed to open CSV '{}': {e}", path.display()))
    })?;
    read_modeling_csv(file)
}

/// Read a modeling dataset CSV from any reader.
pub fn read_modeling_csv<R: Read>(reader: R) -> Result<IngestedFrame, StageError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| StageError::data(format!("Failed to read CSV headers: {e}")))?
        .clone();

    let names: Vec<String> = headers.iter().map(normalize_header_name).collect();
    let mut frame = DataFrame::new(names);

    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2 because:
        // - records() starts at line 1 after headers
        // - CSV is 1-based line numbers
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        if record.len() != frame.n_cols() {
            row_errors.push(RowError {
                line,
                message: format!(
                    "Expected {} fields, found {}.",
                    frame.n_cols(),
                    record.len()
                ),
            });
            continue;
        }

        let cells = record.iter().map(parse_cell).collect();
        if let Err(e) = frame.push_row(cells) {
            row_errors.push(RowError {
                line,
                message: e.to_string(),
            });
        }
    }

    let rows_used = frame.n_rows();
    if rows_used == 0 {
        return Err(StageError::data(
            "No valid rows remain after CSV ingest.",
        ));
    }

    Ok(IngestedFrame {
        frame,
        rows_read,
        rows_used,
        row_errors,
    })
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header (e.g. "﻿id"). If we don't strip it, column lookups will
    // incorrectly report missing columns.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn parse_cell(field: &str) -> Cell {
    if field.is_empty() || field.eq_ignore_ascii_case("na") {
        return Cell::Missing;
    }
    match field.parse::<f64>() {
        Ok(v) => Cell::Num(v),
        Err(_) => Cell::Text(field.to_string()),
    }
}
