//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can
//! be:
//!
//! - resolved from the runner's in-memory options
//! - carried through the shared modeling context
//! - exported to CSV for downstream reporting

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StageError;

fn default_train_percent() -> f64 {
    0.8
}

fn default_times() -> u32 {
    1
}

fn default_dep_var() -> String {
    "dep_var".to_string()
}

fn default_dep_val() -> String {
    "dep_val".to_string()
}

fn default_id_benchmark() -> String {
    "benchmark".to_string()
}

fn default_id_installment() -> String {
    "installment".to_string()
}

fn default_id_funded_amnt() -> String {
    "funded_amnt".to_string()
}

fn default_id_term() -> String {
    "term".to_string()
}

/// Resolved evaluation-stage configuration.
///
/// `output` is the only strictly required key; everything else has a default.
/// Unknown keys in the raw options are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationParameters {
    /// Destination path prefix for persisted outputs (`<output>.csv`).
    pub output: PathBuf,

    /// Fraction of rows assigned to training by the partition strategies that
    /// compute a split themselves.
    #[serde(default = "default_train_percent")]
    pub train_percent: f64,

    /// Explicit 1-based validation row numbers, used verbatim when no
    /// external validation key is present.
    #[serde(default)]
    pub validation_rows: Option<Vec<usize>>,

    /// Dependent-variable column (event indicator).
    #[serde(default = "default_dep_var")]
    pub dep_var: String,

    /// Dependent-value column (observed time / outcome value).
    #[serde(default = "default_dep_val")]
    pub dep_val: String,

    /// Optional identifier column. When configured, its value is attached to
    /// each prediction record and written to the prediction CSV.
    #[serde(default)]
    pub id_column: Option<String>,

    /// Benchmark identifier column.
    #[serde(default = "default_id_benchmark")]
    pub id_benchmark: String,

    /// Per-period payment column.
    #[serde(default = "default_id_installment")]
    pub id_installment: String,

    /// Funded principal column.
    #[serde(default = "default_id_funded_amnt")]
    pub id_funded_amnt: String,

    /// Term column (number of payment periods).
    #[serde(default = "default_id_term")]
    pub id_term: String,

    /// Enable the seeded random stratified partition.
    #[serde(default)]
    pub random_sample: bool,

    /// RNG seed for the random partition; required iff `random_sample`.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Number of evaluation repetitions. Only `1` is supported.
    #[serde(default = "default_times")]
    pub times: u32,
}

impl EvaluationParameters {
    /// Resolve parameters from a raw in-memory options value.
    ///
    /// This is not configuration-file parsing: the runner hands us an already
    /// loaded value and we only apply defaults and cross-field checks.
    pub fn from_value(raw: &Value) -> Result<Self, StageError> {
        let params: Self = serde_json::from_value(raw.clone())
            .map_err(|e| StageError::config(format!("Invalid evaluation options: {e}")))?;
        params.validate()?;
        Ok(params)
    }

    /// Check cross-field requirements that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), StageError> {
        if self.output.as_os_str().is_empty() {
            return Err(StageError::config("`output` is required and must be non-empty."));
        }
        if !self.train_percent.is_finite() || !(0.0..=1.0).contains(&self.train_percent) {
            return Err(StageError::config(format!(
                "`train_percent` must be within [0, 1], got {}.",
                self.train_percent
            )));
        }
        if self.random_sample && self.seed.is_none() {
            return Err(StageError::config(
                "`seed` is required when `random_sample` is enabled.",
            ));
        }
        if self.times != 1 {
            return Err(StageError::config(format!(
                "`times = {}` is not supported; only a single evaluation pass is implemented.",
                self.times
            )));
        }
        Ok(())
    }

    /// Path of the persisted prediction CSV (`<output>.csv`).
    pub fn csv_output_path(&self) -> PathBuf {
        append_extension(&self.output, "csv")
    }
}

/// Append an extension to a path prefix without replacing an existing one
/// (`out/eval.v2` becomes `out/eval.v2.csv`).
fn append_extension(prefix: &Path, extension: &str) -> PathBuf {
    let mut os = prefix.as_os_str().to_os_string();
    os.push(".");
    os.push(extension);
    PathBuf::from(os)
}

/// One scored validation row.
///
/// Records are assembled once by the scorer and immutable afterwards; they
/// live for the duration of the evaluation stage (and in the context for
/// downstream reporting).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRecord {
    /// 1-based row number in the source dataset.
    pub row_no: usize,
    /// Dependent-variable value (event indicator).
    pub dep_var: f64,
    /// Dependent value (observed time / outcome value).
    pub dep_val: f64,
    /// Benchmark identifier value for the row.
    pub benchmark: f64,
    /// Per-period payment.
    pub installment: f64,
    /// Funded principal.
    pub funded_amnt: f64,
    /// Number of payment periods (months).
    pub term: usize,
    /// Model linear score for the row.
    pub score: f64,
    /// Identifier value, present iff `id_column` is configured.
    pub id: Option<String>,
}

/// Model-vs-benchmark IRR pair for one prediction record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrrComparison {
    /// Benchmark identifier value carried over from the record.
    pub benchmark: f64,
    /// IRR implied by the survival-scaled expected cashflows.
    pub model_irr: f64,
    /// Contractual IRR ignoring survival.
    pub benchmark_irr: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_fill_everything_but_output() {
        let params = EvaluationParameters::from_value(&json!({ "output": "out/eval" })).unwrap();
        assert_eq!(params.train_percent, 0.8);
        assert_eq!(params.dep_var, "dep_var");
        assert_eq!(params.dep_val, "dep_val");
        assert_eq!(params.id_benchmark, "benchmark");
        assert_eq!(params.id_installment, "installment");
        assert_eq!(params.id_funded_amnt, "funded_amnt");
        assert_eq!(params.id_term, "term");
        assert!(params.id_column.is_none());
        assert!(!params.random_sample);
        assert!(params.seed.is_none());
        assert_eq!(params.times, 1);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let params = EvaluationParameters::from_value(&json!({
            "output": "out/eval",
            "plot_backend": "png",
            "verbose": true,
        }))
        .unwrap();
        assert_eq!(params.output, PathBuf::from("out/eval"));
    }

    #[test]
    fn missing_output_is_a_config_error() {
        let err = EvaluationParameters::from_value(&json!({})).unwrap_err();
        assert!(matches!(err, StageError::Config(_)));
    }

    #[test]
    fn random_sample_requires_seed() {
        let err = EvaluationParameters::from_value(&json!({
            "output": "out/eval",
            "random_sample": true,
        }))
        .unwrap_err();
        assert!(matches!(err, StageError::Config(_)));

        let ok = EvaluationParameters::from_value(&json!({
            "output": "out/eval",
            "random_sample": true,
            "seed": 42,
        }));
        assert!(ok.is_ok());
    }

    #[test]
    fn repeated_evaluation_is_rejected() {
        let err = EvaluationParameters::from_value(&json!({
            "output": "out/eval",
            "times": 2,
        }))
        .unwrap_err();
        assert!(matches!(err, StageError::Config(_)));
    }

    #[test]
    fn csv_path_appends_extension() {
        let params = EvaluationParameters::from_value(&json!({ "output": "out/eval.v2" })).unwrap();
        assert_eq!(params.csv_output_path(), PathBuf::from("out/eval.v2.csv"));
    }
}
