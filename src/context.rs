//! Shared modeling context passed between pipeline stages.
//!
//! The context is the one piece of intentional shared state in this crate. It
//! is owned by the enclosing pipeline runner, lives for exactly one pipeline
//! run, and is handed to each stage in sequence. The write discipline is:
//!
//! - each stage mutates only its own sub-record (`evaluation_stage` for the
//!   evaluation stage, `export_stage` for the export stage)
//! - cross-stage reads (e.g. the evaluation stage reading the trained model
//!   from `model_stage`) are read-only and rely on the runner having completed
//!   the upstream stage first
//!
//! There is no locking because the runner executes stages one at a time.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data::DataFrame;
use crate::domain::{EvaluationParameters, IrrComparison, PredictionRecord};
use crate::error::StageError;

/// Capability surface of a trained survival model.
///
/// The model itself is an external collaborator: training happens upstream and
/// the evaluation/export stages only consume the finished artifact.
pub trait Model {
    /// Score each row of `data`, returning one linear score per row.
    fn predict(&self, data: &DataFrame) -> Result<Vec<f64>, StageError>;

    /// Baseline per-period survival curve fitted during training.
    fn baseline_fcn(&self) -> &SurvivalCurve;
}

/// Ordered per-period baseline survival probabilities.
///
/// Periods are 1-based: `prob(1)` is the probability of surviving the first
/// payment period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurvivalCurve(Vec<f64>);

impl SurvivalCurve {
    pub fn new(probs: Vec<f64>) -> Self {
        SurvivalCurve(probs)
    }

    /// Number of periods the curve covers.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Survival probability for a 1-based `period`.
    pub fn prob(&self, period: usize) -> Option<f64> {
        if period == 0 {
            return None;
        }
        self.0.get(period - 1).copied()
    }

    pub fn probs(&self) -> &[f64] {
        &self.0
    }
}

/// Shared mutable state for one pipeline run.
///
/// Initialized by the runner at pipeline start and dropped at pipeline end;
/// not a general singleton.
#[derive(Default)]
pub struct ModelingContext {
    pub model_stage: ModelStage,
    pub data_stage: DataStage,
    pub evaluation_stage: EvaluationState,
    pub export_stage: ExportState,
}

/// Written by the training stage; read-only for everything downstream.
#[derive(Default)]
pub struct ModelStage {
    pub model: Option<Arc<dyn Model>>,
}

/// Written by the data stage; read-only for everything downstream.
#[derive(Debug, Clone, Default)]
pub struct DataStage {
    /// Row identifiers held out for validation by an upstream data split.
    ///
    /// When present, this takes precedence over every other partition
    /// strategy (see `eval::partition`).
    pub validation_primary_key: Option<BTreeSet<String>>,
}

/// Evaluation-stage sub-record: configuration in, results out.
#[derive(Debug, Clone, Default)]
pub struct EvaluationState {
    /// Resolved evaluation configuration, supplied by the runner.
    pub params: Option<EvaluationParameters>,
    /// One record per scored validation row (written by the scorer).
    pub prediction_data: Vec<PredictionRecord>,
    /// Copy of the model's baseline survival curve (written by the scorer for
    /// the IRR comparator).
    pub baseline_fcn: Option<SurvivalCurve>,
    /// Model-vs-benchmark IRR pairs (written by the comparator).
    pub irr_comparison: Vec<IrrComparison>,
}

/// Export-stage sub-record: raw export configuration.
#[derive(Debug, Clone, Default)]
pub struct ExportState {
    /// Either a mapping of adapter keyword to options, or a single scalar
    /// resource identifier (coerced under the default keyword at build time).
    pub options: Option<Value>,
}
