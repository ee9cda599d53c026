//! Export stage: bind storage adapters at build time, then run independent
//! write actions.
//!
//! The builder resolves every adapter while the pipeline is being assembled,
//! so an unknown keyword surfaces before anything runs. Each produced action
//! is an explicit immutable record capturing its own adapter and options by
//! value; nothing is re-read from the configuration at execution time.
//!
//! A failing `write` is surfaced as a structured [`StageError::Write`] carrying
//! the adapter keyword and the underlying cause. It is never swallowed; the
//! caller decides whether to continue with the remaining actions
//! ([`run_export_actions`] implements the recommended collect-all policy).

pub mod adapter;

pub use adapter::*;

use std::sync::Arc;

use serde_json::Value;

use crate::context::ModelingContext;
use crate::error::StageError;

/// Insertion-ordered export configuration, one entry per backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    entries: Vec<(String, Value)>,
}

impl ExportOptions {
    /// Normalize a raw configuration value.
    ///
    /// A JSON object is taken as keyword → options entries in insertion
    /// order; any other value (a single resource identifier) is wrapped as a
    /// one-entry mapping under `default_keyword`.
    pub fn from_value(raw: &Value, default_keyword: &str) -> Self {
        match raw {
            Value::Object(map) => ExportOptions {
                entries: map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            },
            other => ExportOptions {
                entries: vec![(default_keyword.to_string(), other.clone())],
            },
        }
    }

    pub fn entries(&self) -> &[(String, Value)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One bound export action.
///
/// The adapter and options are captured by value at build time so each action
/// independently remembers its own backend. There is no late-binding read of
/// shared builder state.
#[derive(Debug)]
pub struct ExportAction {
    name: String,
    keyword: String,
    adapter: Arc<dyn StorageAdapter>,
    options: Value,
}

impl ExportAction {
    /// Display name used by the runner for progress reporting.
    ///
    /// Uniqueness per build call is a caller responsibility: configuring the
    /// same keyword twice yields two actions with the same name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn options(&self) -> &Value {
        &self.options
    }

    /// Write the trained model through the bound adapter.
    pub fn run(&self, ctx: &ModelingContext) -> Result<(), StageError> {
        let model = ctx.model_stage.model.as_ref().ok_or_else(|| {
            StageError::config("Export stage requires a trained model in `model_stage.model`.")
        })?;
        self.adapter
            .write(model.as_ref(), &self.options)
            .map_err(|source| StageError::Write {
                keyword: self.keyword.clone(),
                source,
            })
    }
}

/// Build one bound action per configured backend.
///
/// Adapter resolution happens here, at pipeline-assembly time: an unknown
/// keyword fails the whole build before any action exists.
pub fn build_export_actions(
    registry: &AdapterRegistry,
    raw_options: &Value,
) -> Result<Vec<ExportAction>, StageError> {
    let options = ExportOptions::from_value(raw_options, registry.default_keyword());

    let mut actions = Vec::with_capacity(options.len());
    for (keyword, payload) in options.entries() {
        let adapter = registry.resolve(Some(keyword))?;
        actions.push(ExportAction {
            name: format!("Export to {}", adapter.keyword()),
            keyword: adapter.keyword().to_string(),
            adapter,
            options: payload.clone(),
        });
    }
    Ok(actions)
}

/// Build actions from the configuration stored in the context's export-stage
/// sub-record.
///
/// This is the entry point for runners that stage their configuration through
/// the shared context before assembling the pipeline.
pub fn build_export_actions_from_context(
    registry: &AdapterRegistry,
    ctx: &ModelingContext,
) -> Result<Vec<ExportAction>, StageError> {
    let raw = ctx.export_stage.options.as_ref().ok_or_else(|| {
        StageError::config("Export stage requires options in `export_stage.options`.")
    })?;
    build_export_actions(registry, raw)
}

/// Run every action, isolating per-adapter failure.
///
/// Returns the collected write failures; an empty vector means every backend
/// succeeded. Callers that prefer fail-fast can run the actions themselves.
pub fn run_export_actions(actions: &[ExportAction], ctx: &ModelingContext) -> Vec<StageError> {
    let mut failures = Vec::new();
    for action in actions {
        if let Err(e) = action.run(ctx) {
            failures.push(e);
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use crate::context::{Model, SurvivalCurve};
    use crate::data::DataFrame;

    struct StubModel {
        curve: SurvivalCurve,
    }

    impl Model for StubModel {
        fn predict(&self, data: &DataFrame) -> Result<Vec<f64>, StageError> {
            Ok(vec![0.0; data.n_rows()])
        }

        fn baseline_fcn(&self) -> &SurvivalCurve {
            &self.curve
        }
    }

    struct CountingAdapter {
        keyword: &'static str,
        writes: AtomicUsize,
        fail: bool,
    }

    impl CountingAdapter {
        fn new(keyword: &'static str, fail: bool) -> Arc<Self> {
            Arc::new(CountingAdapter {
                keyword,
                writes: AtomicUsize::new(0),
                fail,
            })
        }
    }

    impl StorageAdapter for CountingAdapter {
        fn keyword(&self) -> &str {
            self.keyword
        }

        fn write(
            &self,
            _model: &dyn Model,
            _options: &Value,
        ) -> Result<(), Box<dyn Error + Send + Sync>> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err("disk full".into());
            }
            Ok(())
        }
    }

    fn context_with_model() -> ModelingContext {
        let mut ctx = ModelingContext::default();
        ctx.model_stage.model = Some(Arc::new(StubModel {
            curve: SurvivalCurve::new(vec![0.99]),
        }));
        ctx
    }

    #[test]
    fn one_action_per_configured_backend_in_order() {
        let mut registry = AdapterRegistry::new();
        registry.register(CountingAdapter::new("s3", false));
        registry.register(CountingAdapter::new("file", false));

        let actions = build_export_actions(
            &registry,
            &json!({ "s3": { "bucket": "models" }, "file": "out/model.rds" }),
        )
        .unwrap();

        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].keyword(), "s3");
        assert_eq!(actions[0].name(), "Export to s3");
        assert_eq!(actions[1].keyword(), "file");
        assert_eq!(actions[1].options(), &json!("out/model.rds"));
    }

    #[test]
    fn scalar_config_is_wrapped_under_the_default_keyword() {
        let mut registry = AdapterRegistry::new();
        registry.register(CountingAdapter::new("file", false));

        let from_scalar = build_export_actions(&registry, &json!("out/model.rds")).unwrap();
        let from_mapping =
            build_export_actions(&registry, &json!({ "file": "out/model.rds" })).unwrap();

        assert_eq!(from_scalar.len(), 1);
        assert_eq!(from_scalar[0].keyword(), from_mapping[0].keyword());
        assert_eq!(from_scalar[0].options(), from_mapping[0].options());
    }

    #[test]
    fn unknown_keyword_fails_the_whole_build() {
        let mut registry = AdapterRegistry::new();
        let file = CountingAdapter::new("file", false);
        registry.register(file.clone());

        let err = build_export_actions(
            &registry,
            &json!({ "file": "out/model.rds", "redis": { "db": 0 } }),
        )
        .unwrap_err();

        assert!(matches!(err, StageError::UnknownAdapter { keyword } if keyword == "redis"));
        // Nothing executed: build-time failure precedes any write.
        assert_eq!(file.writes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn a_failing_write_does_not_stop_the_batch() {
        let mut registry = AdapterRegistry::new();
        let s3 = CountingAdapter::new("s3", true);
        let file = CountingAdapter::new("file", false);
        registry.register(s3.clone());
        registry.register(file.clone());

        let ctx = context_with_model();
        let actions =
            build_export_actions(&registry, &json!({ "s3": {}, "file": "out/model.rds" }))
                .unwrap();
        let failures = run_export_actions(&actions, &ctx);

        assert_eq!(failures.len(), 1);
        assert!(matches!(&failures[0], StageError::Write { keyword, .. } if keyword == "s3"));
        assert_eq!(s3.writes.load(Ordering::SeqCst), 1);
        assert_eq!(file.writes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn context_options_drive_the_build() {
        let mut registry = AdapterRegistry::new();
        registry.register(CountingAdapter::new("file", false));

        let mut ctx = context_with_model();
        ctx.export_stage.options = Some(json!("out/model.rds"));

        let actions = build_export_actions_from_context(&registry, &ctx).unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].keyword(), "file");

        ctx.export_stage.options = None;
        let err = build_export_actions_from_context(&registry, &ctx).unwrap_err();
        assert!(matches!(err, StageError::Config(_)));
    }

    #[test]
    fn running_without_a_model_is_a_config_error() {
        let mut registry = AdapterRegistry::new();
        registry.register(CountingAdapter::new("file", false));

        let ctx = ModelingContext::default();
        let actions = build_export_actions(&registry, &json!("out/model.rds")).unwrap();
        let err = actions[0].run(&ctx).unwrap_err();
        assert!(matches!(err, StageError::Config(_)));
    }
}
