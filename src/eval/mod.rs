//! Evaluation stage orchestration.
//!
//! Keeping the stage workflow in one place avoids duplicating the core
//! sequence: partition -> score -> IRR comparison -> persisted outputs. The
//! individual components stay focused and testable on their own.

pub mod irr;
pub mod partition;
pub mod scorer;

use std::collections::BTreeSet;

use crate::context::ModelingContext;
use crate::data::DataFrame;
use crate::domain::{IrrComparison, PredictionRecord};
use crate::error::StageError;

/// All computed outputs of a single evaluation run.
#[derive(Debug, Clone)]
pub struct EvaluationOutput {
    pub validation_rows: BTreeSet<usize>,
    pub predictions: Vec<PredictionRecord>,
    pub comparisons: Vec<IrrComparison>,
}

/// Execute the evaluation stage against the shared context.
///
/// Reads configuration from `ctx.evaluation_stage.params`, partitions `data`,
/// scores the hold-out rows with the trained model, computes the per-row IRR
/// comparison, records everything in `ctx.evaluation_stage`, and writes the
/// prediction CSV to `<output>.csv`.
pub fn run_evaluation(
    ctx: &mut ModelingContext,
    data: &DataFrame,
) -> Result<EvaluationOutput, StageError> {
    let params = ctx.evaluation_stage.params.clone().ok_or_else(|| {
        StageError::config("Evaluation stage requires parameters in `evaluation_stage.params`.")
    })?;
    params.validate()?;

    // 1) Decide which rows are held out.
    let validation_rows = partition::select_validation_rows(ctx, &params, data)?;

    // 2) Score the hold-out rows with the trained model.
    let predictions = scorer::score_validation_rows(ctx, &params, data, &validation_rows)?;

    // 3) Per-row IRR comparison against the benchmark.
    let curve = ctx.evaluation_stage.baseline_fcn.clone().ok_or_else(|| {
        StageError::data("No baseline survival curve was recorded during scoring.")
    })?;
    let comparisons = irr::compare_irr(&predictions, &curve)?;
    ctx.evaluation_stage.irr_comparison = comparisons.clone();

    // 4) Persist the prediction data.
    crate::report::write_predictions_csv(&params.csv_output_path(), &predictions, &params)?;

    Ok(EvaluationOutput {
        validation_rows,
        predictions,
        comparisons,
    })
}
