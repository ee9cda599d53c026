//! Persisted prediction output and caller-printable IRR summaries.
//!
//! We keep formatting and file-writing in one place so:
//! - the partition/scoring code stays clean and testable
//! - output changes are localized

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::{EvaluationParameters, IrrComparison, PredictionRecord};
use crate::error::StageError;

/// Write the prediction data to a CSV file.
///
/// Columns: `dep_var`, `dep_val`, and the configured id column when present.
/// Header names are the configured selectors, so downstream consumers see the
/// same names as the source dataset.
pub fn write_predictions_csv(
    path: &Path,
    records: &[PredictionRecord],
    params: &EvaluationParameters,
) -> Result<(), StageError> {
    let mut file = File::create(path).map_err(|e| {
        StageError::data(format!(
            "Failed to create prediction CSV '{}': {e}",
            path.display()
        ))
    })?;

    let header = match &params.id_column {
        Some(name) => format!("{},{},{}", params.dep_var, params.dep_val, name),
        None => format!("{},{}", params.dep_var, params.dep_val),
    };
    writeln!(file, "{header}")
        .map_err(|e| StageError::data(format!("Failed to write prediction CSV header: {e}")))?;

    for r in records {
        let line = match &r.id {
            Some(id) => format!("{},{},{}", r.dep_var, r.dep_val, id),
            None => format!("{},{}", r.dep_var, r.dep_val),
        };
        writeln!(file, "{line}")
            .map_err(|e| StageError::data(format!("Failed to write prediction CSV row: {e}")))?;
    }

    Ok(())
}

/// Format the IRR comparison as a terminal-friendly summary.
pub fn format_irr_summary(comparisons: &[IrrComparison]) -> String {
    let mut out = String::new();

    out.push_str("=== IRR comparison (model vs benchmark) ===\n");
    if comparisons.is_empty() {
        out.push_str("No comparisons.\n");
        return out;
    }

    let model: Vec<f64> = comparisons.iter().map(|c| c.model_irr).collect();
    let benchmark: Vec<f64> = comparisons.iter().map(|c| c.benchmark_irr).collect();
    let spread_mean = mean(&model) - mean(&benchmark);

    out.push_str(&format!("Rows: {}\n", comparisons.len()));
    out.push_str(&format!(
        "Model IRR:     mean={:.4} min={:.4} max={:.4}\n",
        mean(&model),
        min(&model),
        max(&model)
    ));
    out.push_str(&format!(
        "Benchmark IRR: mean={:.4} min={:.4} max={:.4}\n",
        mean(&benchmark),
        min(&benchmark),
        max(&benchmark)
    ));
    out.push_str(&format!("Mean spread (model - benchmark): {spread_mean:.4}\n"));

    out
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}
