//! Storage adapter capability and keyword registry.
//!
//! Adapters are external collaborators: each one is an opaque backend with an
//! immutable keyword identity and a single `write` operation. The registry is
//! a pure build-time lookup; adapters are resolved once while the pipeline is
//! being assembled and never re-resolved during execution.

use std::collections::BTreeMap;
use std::error::Error;
use std::sync::Arc;

use serde_json::Value;

use crate::context::Model;
use crate::error::StageError;

/// Keyword used when an export configuration is not keyed by adapter.
pub const DEFAULT_ADAPTER_KEYWORD: &str = "file";

/// A pluggable storage backend capable of persisting a trained model.
pub trait StorageAdapter {
    /// Immutable identity used to select this adapter in export options.
    fn keyword(&self) -> &str;

    /// Persist the model artifact with adapter-specific `options`.
    ///
    /// Adapter state (connections, caching, retries) is the adapter's own
    /// business; this crate only routes the call and wraps failures.
    fn write(
        &self,
        model: &dyn Model,
        options: &Value,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}

impl std::fmt::Debug for dyn StorageAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageAdapter")
            .field("keyword", &self.keyword())
            .finish()
    }
}

/// Build-time lookup from keyword to adapter capability.
pub struct AdapterRegistry {
    adapters: BTreeMap<String, Arc<dyn StorageAdapter>>,
    default_keyword: String,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::with_default_keyword(DEFAULT_ADAPTER_KEYWORD)
    }

    /// Registry whose unkeyed configurations resolve to `default_keyword`.
    pub fn with_default_keyword(default_keyword: impl Into<String>) -> Self {
        AdapterRegistry {
            adapters: BTreeMap::new(),
            default_keyword: default_keyword.into(),
        }
    }

    /// Register an adapter under its own keyword. A later registration with
    /// the same keyword replaces the earlier one.
    pub fn register(&mut self, adapter: Arc<dyn StorageAdapter>) {
        self.adapters.insert(adapter.keyword().to_string(), adapter);
    }

    /// Resolve a keyword to its adapter; `None` means the default keyword.
    pub fn resolve(&self, keyword: Option<&str>) -> Result<Arc<dyn StorageAdapter>, StageError> {
        let keyword = keyword.unwrap_or(&self.default_keyword);
        self.adapters.get(keyword).cloned().ok_or_else(|| {
            StageError::UnknownAdapter {
                keyword: keyword.to_string(),
            }
        })
    }

    pub fn default_keyword(&self) -> &str {
        &self.default_keyword
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
