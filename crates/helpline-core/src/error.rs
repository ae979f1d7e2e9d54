use thiserror::Error;

/// Top-level error type for the Helpline system.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for HelplineError` so that `?` works across crate
/// boundaries in the composition root.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HelplineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Dialogue error: {0}")]
    Dialogue(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for HelplineError {
    fn from(err: toml::de::Error) -> Self {
        HelplineError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for HelplineError {
    fn from(err: toml::ser::Error) -> Self {
        HelplineError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for HelplineError {
    fn from(err: serde_json::Error) -> Self {
        HelplineError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Helpline operations.
pub type Result<T> = std::result::Result<T, HelplineError>;
