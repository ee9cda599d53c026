//! Proportional-hazards IRR comparison.
//!
//! For each prediction record the baseline survival curve is scaled by the
//! model's linear score and the resulting expected cashflows are priced
//! against the contractual schedule. The scaling is the single non-trivial
//! numerical transform of the evaluation stage:
//!
//! ```text
//! survival_probs[t] = baseline(t) ^ exp(score)    for t in 1..=term
//! ```

use crate::context::SurvivalCurve;
use crate::domain::{IrrComparison, PredictionRecord};
use crate::error::StageError;
use crate::math::calc_irr;

/// Scale the baseline survival curve by `exp(score)` for `term` periods.
///
/// The term must fit inside the curve: a loan with more periods than the
/// fitted baseline cannot be priced and fails with a `Data` error.
pub fn scale_survival_curve(
    curve: &SurvivalCurve,
    score: f64,
    term: usize,
) -> Result<Vec<f64>, StageError> {
    if term == 0 {
        return Err(StageError::data("Term must cover at least one period."));
    }
    if term > curve.len() {
        return Err(StageError::data(format!(
            "Term of {term} periods exceeds the {}-period baseline survival curve.",
            curve.len()
        )));
    }
    let hazard_scale = score.exp();
    Ok(curve.probs()[..term]
        .iter()
        .map(|p| p.powf(hazard_scale))
        .collect())
}

/// Model-vs-benchmark IRR for each record, in input order.
pub fn compare_irr(
    records: &[PredictionRecord],
    curve: &SurvivalCurve,
) -> Result<Vec<IrrComparison>, StageError> {
    let mut out = Vec::with_capacity(records.len());
    for record in records {
        let probs = scale_survival_curve(curve, record.score, record.term)?;
        let model_irr = calc_irr(true, record, Some(&probs))?;
        let benchmark_irr = calc_irr(false, record, None)?;
        out.push(IrrComparison {
            benchmark: record.benchmark,
            model_irr,
            benchmark_irr,
        });
    }
    Ok(out)
}
