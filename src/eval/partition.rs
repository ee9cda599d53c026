//! Validation-partition selection.
//!
//! Exactly one of four strategies applies per call, chosen by this strict
//! precedence order (first match wins):
//!
//! 1. external validation key from the data stage
//! 2. explicit `validation_rows` from the parameters
//! 3. seeded random partition, stratified by the dependent variable
//! 4. sequential tail split (default)
//!
//! All row numbers are 1-based. An empty result is valid but degenerate (e.g.
//! `train_percent = 1.0` on a small dataset).

use std::collections::{BTreeMap, BTreeSet};

use rand::prelude::*;
use rand::rngs::StdRng;

use crate::context::ModelingContext;
use crate::data::DataFrame;
use crate::domain::EvaluationParameters;
use crate::error::StageError;

/// Decide which rows are held out for validation.
pub fn select_validation_rows(
    ctx: &ModelingContext,
    params: &EvaluationParameters,
    data: &DataFrame,
) -> Result<BTreeSet<usize>, StageError> {
    if let Some(key) = &ctx.data_stage.validation_primary_key {
        return select_by_primary_key(key, params, data);
    }
    if let Some(rows) = &params.validation_rows {
        return select_explicit_rows(rows, data.n_rows());
    }
    if params.random_sample {
        return select_random_stratified(params, data);
    }
    Ok(sequential_tail_rows(params.train_percent, data.n_rows()))
}

/// Rows whose `id_column` value is a member of the upstream key set.
fn select_by_primary_key(
    key: &BTreeSet<String>,
    params: &EvaluationParameters,
    data: &DataFrame,
) -> Result<BTreeSet<usize>, StageError> {
    let Some(id_column) = &params.id_column else {
        return Err(StageError::data(
            "A validation primary key is present but no `id_column` is configured.",
        ));
    };
    data.require_column(id_column)?;

    let mut rows = BTreeSet::new();
    for row_no in 1..=data.n_rows() {
        if key.contains(&data.value_key(row_no, id_column)?) {
            rows.insert(row_no);
        }
    }
    Ok(rows)
}

/// Explicit row numbers, used verbatim after a bounds check.
fn select_explicit_rows(rows: &[usize], n_rows: usize) -> Result<BTreeSet<usize>, StageError> {
    let mut out = BTreeSet::new();
    for &row_no in rows {
        if row_no == 0 || row_no > n_rows {
            return Err(StageError::data(format!(
                "Validation row {row_no} is out of range for a {n_rows}-row dataset."
            )));
        }
        out.insert(row_no);
    }
    Ok(out)
}

/// Deterministic seeded partition, stratified by the dependent variable.
///
/// Each stratum is shuffled with the same seeded RNG and split at
/// `round(train_percent * stratum_size)`; the validation set is the complement
/// of the sampled training rows. BTreeMap stratum order plus a fixed seed make
/// repeated calls identical.
fn select_random_stratified(
    params: &EvaluationParameters,
    data: &DataFrame,
) -> Result<BTreeSet<usize>, StageError> {
    let Some(seed) = params.seed else {
        return Err(StageError::config(
            "`seed` is required when `random_sample` is enabled.",
        ));
    };
    data.require_column(&params.dep_var)?;

    let mut strata: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for row_no in 1..=data.n_rows() {
        strata
            .entry(data.value_key(row_no, &params.dep_var)?)
            .or_default()
            .push(row_no);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut validation = BTreeSet::new();
    for rows in strata.values() {
        let mut shuffled = rows.clone();
        shuffled.shuffle(&mut rng);
        let train_n = ((params.train_percent * shuffled.len() as f64).round() as usize)
            .min(shuffled.len());
        for &row_no in shuffled.iter().skip(train_n) {
            validation.insert(row_no);
        }
    }
    Ok(validation)
}

/// Last `(1 - train_percent)` fraction of rows by original order:
/// `round(train_percent * n) + 1 ..= n`.
fn sequential_tail_rows(train_percent: f64, n_rows: usize) -> BTreeSet<usize> {
    let start = (train_percent * n_rows as f64).round() as usize + 1;
    (start..=n_rows).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Cell;
    use serde_json::json;

    fn params(options: serde_json::Value) -> EvaluationParameters {
        EvaluationParameters::from_value(&options).unwrap()
    }

    fn frame(n: usize) -> DataFrame {
        let mut f = DataFrame::new(vec!["id".to_string(), "dep_var".to_string()]);
        for i in 1..=n {
            f.push_row(vec![
                Cell::Text(format!("L{i}")),
                Cell::Num((i % 2) as f64),
            ])
            .unwrap();
        }
        f
    }

    #[test]
    fn sequential_tail_split_matches_the_contract() {
        let ctx = ModelingContext::default();
        let p = params(json!({ "output": "out/eval" }));
        let rows = select_validation_rows(&ctx, &p, &frame(10)).unwrap();
        assert_eq!(rows, [9, 10].into_iter().collect());
    }

    #[test]
    fn external_key_wins_over_explicit_rows() {
        let mut ctx = ModelingContext::default();
        ctx.data_stage.validation_primary_key =
            Some(["L1".to_string(), "L3".to_string()].into_iter().collect());

        // Conflicting, non-overlapping explicit rows: the key must win.
        let p = params(json!({
            "output": "out/eval",
            "id_column": "id",
            "validation_rows": [5, 6],
        }));
        let rows = select_validation_rows(&ctx, &p, &frame(10)).unwrap();
        assert_eq!(rows, [1, 3].into_iter().collect());
    }

    #[test]
    fn external_key_without_id_column_is_a_data_error() {
        let mut ctx = ModelingContext::default();
        ctx.data_stage.validation_primary_key = Some(["L1".to_string()].into_iter().collect());

        let p = params(json!({ "output": "out/eval" }));
        let err = select_validation_rows(&ctx, &p, &frame(10)).unwrap_err();
        assert!(matches!(err, StageError::Data(_)));
    }

    #[test]
    fn explicit_rows_are_used_verbatim() {
        let ctx = ModelingContext::default();
        let p = params(json!({ "output": "out/eval", "validation_rows": [2, 7, 7] }));
        let rows = select_validation_rows(&ctx, &p, &frame(10)).unwrap();
        assert_eq!(rows, [2, 7].into_iter().collect());
    }

    #[test]
    fn explicit_rows_out_of_range_are_rejected() {
        let ctx = ModelingContext::default();
        let p = params(json!({ "output": "out/eval", "validation_rows": [11] }));
        assert!(select_validation_rows(&ctx, &p, &frame(10)).is_err());
    }

    #[test]
    fn random_partition_is_deterministic_for_a_fixed_seed() {
        let ctx = ModelingContext::default();
        let p = params(json!({
            "output": "out/eval",
            "random_sample": true,
            "seed": 42,
        }));
        let data = frame(50);
        let first = select_validation_rows(&ctx, &p, &data).unwrap();
        let second = select_validation_rows(&ctx, &p, &data).unwrap();
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn random_partition_holds_out_the_complement_per_stratum() {
        let ctx = ModelingContext::default();
        let p = params(json!({
            "output": "out/eval",
            "random_sample": true,
            "seed": 7,
        }));
        // 10 rows, two strata of 5; round(0.8 * 5) = 4 training rows each.
        let rows = select_validation_rows(&ctx, &p, &frame(10)).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn missing_seed_is_a_config_error_at_selection_time() {
        let ctx = ModelingContext::default();
        // Bypass from_value validation to exercise the selector's own check.
        let mut p = params(json!({ "output": "out/eval" }));
        p.random_sample = true;
        let err = select_validation_rows(&ctx, &p, &frame(10)).unwrap_err();
        assert!(matches!(err, StageError::Config(_)));
    }
}
