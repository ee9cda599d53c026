//! Score hold-out rows and assemble prediction records.
//!
//! The scorer is the only evaluation component that touches the trained
//! model: it slices the dataset to the validation rows, asks the model for one
//! score per row, and pulls the configured columns into flat
//! [`PredictionRecord`]s. It also copies the model's baseline survival curve
//! into the context so the IRR comparator can run without re-reading the
//! model.

use std::collections::BTreeSet;

use crate::context::ModelingContext;
use crate::data::DataFrame;
use crate::domain::{EvaluationParameters, PredictionRecord};
use crate::error::StageError;

/// Score the validation rows and record the results in the context.
pub fn score_validation_rows(
    ctx: &mut ModelingContext,
    params: &EvaluationParameters,
    data: &DataFrame,
    validation_rows: &BTreeSet<usize>,
) -> Result<Vec<PredictionRecord>, StageError> {
    if validation_rows.is_empty() {
        return Err(StageError::data("Validation set is empty; nothing to score."));
    }

    let model = ctx.model_stage.model.clone().ok_or_else(|| {
        StageError::config("Evaluation stage requires a trained model in `model_stage.model`.")
    })?;

    let slice = data.slice_rows(validation_rows)?;
    let scores = model.predict(&slice)?;
    if scores.len() != slice.n_rows() {
        return Err(StageError::data(format!(
            "Model returned {} scores for {} validation rows.",
            scores.len(),
            slice.n_rows()
        )));
    }

    let mut records = Vec::with_capacity(scores.len());
    for (i, &row_no) in validation_rows.iter().enumerate() {
        let term = data.num(row_no, &params.id_term)?;
        if !(term.is_finite() && term >= 1.0) {
            return Err(StageError::data(format!(
                "Row {row_no} has an unusable term value in column `{}`.",
                params.id_term
            )));
        }

        let id = match &params.id_column {
            Some(name) => Some(data.value_key(row_no, name)?),
            None => None,
        };

        records.push(PredictionRecord {
            row_no,
            dep_var: data.num(row_no, &params.dep_var)?,
            dep_val: data.num(row_no, &params.dep_val)?,
            benchmark: data.num(row_no, &params.id_benchmark)?,
            installment: data.num(row_no, &params.id_installment)?,
            funded_amnt: data.num(row_no, &params.id_funded_amnt)?,
            term: term.round() as usize,
            score: scores[i],
            id,
        });
    }

    ctx.evaluation_stage.prediction_data = records.clone();
    ctx.evaluation_stage.baseline_fcn = Some(model.baseline_fcn().clone());

    Ok(records)
}
