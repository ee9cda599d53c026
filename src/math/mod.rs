//! Cashflow mathematics: NPV and the IRR root solver.
//!
//! The evaluation stage repeatedly answers one question per validation row:
//! what discount rate makes the loan's cashflow schedule break even?
//!
//! ```text
//! 0 = -funded_amnt + Σ cf_t / (1 + r)^t
//! ```
//!
//! Implementation choices:
//! - Expected cashflows: each installment is weighted by the matching model
//!   survival probability when scoring the model, and taken as-is for the
//!   contractual benchmark.
//! - The per-period root is found by bracketed bisection. NPV is strictly
//!   decreasing in the rate for a schedule of non-negative inflows, so a sign
//!   change brackets exactly one root; bisection is slower than Newton but
//!   cannot diverge on the flat tails these schedules produce.
//! - Loan terms are months; the periodic root is compounded to an annual
//!   figure.

use crate::domain::PredictionRecord;
use crate::error::StageError;

/// Payment periods per year (loan terms are expressed in months).
const PERIODS_PER_YEAR: i32 = 12;

/// Bisection stops when the bracket is narrower than this.
const RATE_TOLERANCE: f64 = 1e-12;

/// Net present value of a loan cashflow schedule at per-period `rate`.
///
/// `cashflows[0]` is the period-1 flow; the funded principal is the period-0
/// outflow.
pub fn npv(rate: f64, funded_amnt: f64, cashflows: &[f64]) -> f64 {
    let mut acc = -funded_amnt;
    let mut discount = 1.0;
    for cf in cashflows {
        discount *= 1.0 + rate;
        acc += cf / discount;
    }
    acc
}

/// Internal rate of return of a prediction record's cashflow schedule,
/// compounded to an annual rate.
///
/// When `use_model` is true, each installment is weighted by the matching
/// survival probability (expected cashflows; `survival_probs` must cover the
/// record's term). When false, the contractual schedule is used as-is and
/// `survival_probs` is ignored.
pub fn calc_irr(
    use_model: bool,
    record: &PredictionRecord,
    survival_probs: Option<&[f64]>,
) -> Result<f64, StageError> {
    if !(record.funded_amnt.is_finite() && record.funded_amnt > 0.0) {
        return Err(StageError::data(format!(
            "Row {} has an unusable funded amount {}.",
            record.row_no, record.funded_amnt
        )));
    }
    if record.term == 0 {
        return Err(StageError::data(format!(
            "Row {} has a zero-period term.",
            record.row_no
        )));
    }

    let cashflows: Vec<f64> = if use_model {
        let probs = survival_probs.ok_or_else(|| {
            StageError::data("Model IRR requires the scaled survival probabilities.")
        })?;
        if probs.len() < record.term {
            return Err(StageError::data(format!(
                "Survival probabilities cover {} periods but row {} has a term of {}.",
                probs.len(),
                record.row_no,
                record.term
            )));
        }
        (0..record.term)
            .map(|t| record.installment * probs[t])
            .collect()
    } else {
        vec![record.installment; record.term]
    };

    let periodic = solve_irr(record.funded_amnt, &cashflows).ok_or_else(|| {
        StageError::data(format!(
            "IRR did not converge for row {} (no sign change in NPV).",
            record.row_no
        ))
    })?;

    Ok((1.0 + periodic).powi(PERIODS_PER_YEAR) - 1.0)
}

/// Bracketed bisection on the per-period rate.
///
/// Returns `None` when the schedule has no root (e.g. every cashflow is zero).
fn solve_irr(funded_amnt: f64, cashflows: &[f64]) -> Option<f64> {
    // Just above -100% per period; NPV blows up toward +inf here for any
    // schedule with a positive inflow.
    let mut lo = -0.9999;
    let mut hi = 1.0;

    let mut f_lo = npv(lo, funded_amnt, cashflows);
    if !f_lo.is_finite() || f_lo <= 0.0 {
        return None;
    }

    // Expand the upper bracket until NPV turns negative.
    let mut f_hi = npv(hi, funded_amnt, cashflows);
    while f_hi > 0.0 {
        hi *= 2.0;
        if hi > 1e6 {
            return None;
        }
        f_hi = npv(hi, funded_amnt, cashflows);
    }

    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        let f_mid = npv(mid, funded_amnt, cashflows);
        if f_mid.abs() < RATE_TOLERANCE || (hi - lo) < RATE_TOLERANCE {
            return Some(mid);
        }
        if f_lo * f_mid < 0.0 {
            hi = mid;
        } else {
            lo = mid;
            f_lo = f_mid;
        }
    }
    Some(0.5 * (lo + hi))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(installment: f64, funded_amnt: f64, term: usize) -> PredictionRecord {
        PredictionRecord {
            row_no: 1,
            dep_var: 0.0,
            dep_val: 0.0,
            benchmark: 0.1,
            installment,
            funded_amnt,
            term,
            score: 0.0,
            id: None,
        }
    }

    #[test]
    fn npv_at_zero_rate_is_inflows_minus_principal() {
        let value = npv(0.0, 1000.0, &[100.0; 12]);
        assert!((value - 200.0).abs() < 1e-9);
    }

    #[test]
    fn benchmark_irr_zeroes_the_npv() {
        let rec = record(100.0, 1000.0, 12);
        let annual = calc_irr(false, &rec, None).unwrap();
        assert!(annual > 0.0);

        let periodic = (1.0 + annual).powf(1.0 / 12.0) - 1.0;
        let residual = npv(periodic, rec.funded_amnt, &[100.0; 12]);
        assert!(residual.abs() < 1e-6, "residual NPV was {residual}");
    }

    #[test]
    fn certain_survival_matches_the_benchmark() {
        let rec = record(100.0, 1000.0, 12);
        let benchmark = calc_irr(false, &rec, None).unwrap();
        let model = calc_irr(true, &rec, Some(&[1.0; 12])).unwrap();
        assert!((benchmark - model).abs() < 1e-9);
    }

    #[test]
    fn lower_survival_lowers_the_irr() {
        let rec = record(100.0, 1000.0, 12);
        let full = calc_irr(true, &rec, Some(&[1.0; 12])).unwrap();
        let dimmed = calc_irr(true, &rec, Some(&[0.9; 12])).unwrap();
        assert!(dimmed < full);
    }

    #[test]
    fn total_loss_schedule_does_not_converge() {
        let rec = record(100.0, 1000.0, 12);
        let err = calc_irr(true, &rec, Some(&[0.0; 12])).unwrap_err();
        assert!(matches!(err, StageError::Data(_)));
    }

    #[test]
    fn short_probability_vector_is_rejected() {
        let rec = record(100.0, 1000.0, 12);
        let err = calc_irr(true, &rec, Some(&[1.0; 6])).unwrap_err();
        assert!(matches!(err, StageError::Data(_)));
    }
}
