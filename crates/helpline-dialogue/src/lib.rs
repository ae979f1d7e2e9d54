//! Dialogue state and response selection for Helpline.
//!
//! Turns a classifier prediction plus the user's prior state into a reply,
//! records the turn and persists the conversation store.

pub mod catalog;
pub mod classifier;
pub mod dataset;
pub mod engine;
pub mod error;

pub use catalog::ResponseCatalog;
pub use classifier::{Classifier, PatternClassifier, ScriptedClassifier};
pub use engine::{DialogueEngine, ReplyPolicy, Turn};
pub use error::{CatalogError, ClassifierError, DialogueError};
