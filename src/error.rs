use std::error::Error;
use std::fmt;

/// An error raised while building or running a pipeline stage.
///
/// Stages fail in four distinct ways, and the variant tells the pipeline
/// runner which precondition broke:
///
/// - [`StageError::UnknownAdapter`] — fatal at build time, before any action
///   exists
/// - [`StageError::Write`] — one adapter's write failed; other export actions
///   in the batch are unaffected
/// - [`StageError::Config`] — missing or unsupported stage configuration,
///   raised before any partition/scoring work begins
/// - [`StageError::Data`] — a dataset column or field was missing or unusable
#[derive(Debug)]
pub enum StageError {
    /// An export keyword has no registered storage backend.
    UnknownAdapter { keyword: String },
    /// A storage adapter failed to persist the model artifact.
    Write {
        keyword: String,
        source: Box<dyn Error + Send + Sync>,
    },
    /// Missing or unsupported stage configuration.
    Config(String),
    /// A dataset column or field was missing or unusable.
    Data(String),
}

impl StageError {
    pub fn config(message: impl Into<String>) -> Self {
        StageError::Config(message.into())
    }

    pub fn data(message: impl Into<String>) -> Self {
        StageError::Data(message.into())
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageError::UnknownAdapter { keyword } => {
                write!(f, "No storage adapter registered for keyword `{keyword}`.")
            }
            StageError::Write { keyword, source } => {
                write!(f, "Export to `{keyword}` failed: {source}")
            }
            StageError::Config(message) | StageError::Data(message) => {
                write!(f, "{message}")
            }
        }
    }
}

impl Error for StageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StageError::Write { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_error_exposes_cause() {
        let err = StageError::Write {
            keyword: "s3".to_string(),
            source: "bucket unavailable".into(),
        };
        assert!(err.to_string().contains("`s3`"));
        assert!(err.source().is_some());
    }

    #[test]
    fn unknown_adapter_names_keyword() {
        let err = StageError::UnknownAdapter {
            keyword: "redis".to_string(),
        };
        assert!(err.to_string().contains("`redis`"));
    }
}
