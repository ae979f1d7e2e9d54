//! Error types for conversation persistence.

use std::path::PathBuf;

use helpline_core::error::HelplineError;

/// Errors from loading or saving conversation state.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<StoreError> for HelplineError {
    fn from(err: StoreError) -> Self {
        HelplineError::Storage(err.to_string())
    }
}
