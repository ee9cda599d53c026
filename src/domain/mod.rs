//! Domain types used throughout the stage library.
//!
//! This module defines:
//!
//! - the resolved evaluation configuration (`EvaluationParameters`)
//! - per-row evaluation outputs (`PredictionRecord`, `IrrComparison`)

pub mod types;

pub use types::*;
