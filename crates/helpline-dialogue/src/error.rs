//! Error types for the dialogue engine and its collaborators.

use std::path::PathBuf;

use helpline_core::error::HelplineError;
use helpline_storage::StoreError;

/// Errors from loading or querying the response catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("no responses for category '{0}'")]
    UnknownCategory(String),
    #[error("category '{0}' has no responses")]
    EmptyCategory(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors raised by a classifier adapter.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("classifier unavailable: {0}")]
    Unavailable(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("confidence {confidence} for '{category}' is outside [0, 1]")]
    InvalidConfidence { category: String, confidence: f64 },
}

/// Failures of a single dialogue turn.
///
/// None of these are ever turned into an ordinary reply; the clarification
/// message is reserved for low-confidence predictions.
#[derive(Debug, thiserror::Error)]
pub enum DialogueError {
    /// The classifier emitted a label the catalog does not cover.
    #[error("configuration error: no responses for category '{0}'")]
    UnknownCategory(String),
    /// A confidence threshold that is NaN or outside [0, 1].
    #[error("confidence threshold {0} is outside [0, 1]")]
    InvalidThreshold(f64),
    #[error("classifier error: {0}")]
    Classifier(#[from] ClassifierError),
    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),
}

impl From<CatalogError> for HelplineError {
    fn from(err: CatalogError) -> Self {
        HelplineError::Catalog(err.to_string())
    }
}

impl From<ClassifierError> for HelplineError {
    fn from(err: ClassifierError) -> Self {
        HelplineError::Classifier(err.to_string())
    }
}

impl From<DialogueError> for HelplineError {
    fn from(err: DialogueError) -> Self {
        match err {
            DialogueError::Persistence(e) => e.into(),
            DialogueError::Classifier(e) => e.into(),
            other => HelplineError::Dialogue(other.to_string()),
        }
    }
}
