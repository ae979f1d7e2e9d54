//! Shared configuration, error and data types for the Helpline workspace.

pub mod config;
pub mod error;
pub mod types;

pub use config::HelplineConfig;
pub use error::{HelplineError, Result};
pub use types::*;
