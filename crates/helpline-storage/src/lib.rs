//! Helpline Storage crate - durable per-user conversation state.
//!
//! The whole store is rewritten on every save; there is no incremental
//! update path. Save cost therefore grows with the total number of turns
//! across all users.

pub mod error;
pub mod json_store;
pub mod memory;

pub use error::StoreError;
pub use json_store::JsonFileStore;
pub use memory::MemoryStore;

use std::sync::Arc;

use helpline_core::Conversations;

/// Durable mapping from user identifier to dialogue state.
pub trait ConversationStore: Send {
    /// Read the full store. A missing or empty source yields an empty map.
    fn load(&self) -> Result<Conversations, StoreError>;

    /// Replace the durable representation with `conversations`.
    fn save(&self, conversations: &Conversations) -> Result<(), StoreError>;
}

/// Shared handles persist into the same snapshot, so a test can keep one
/// clone for inspection while the engine owns another.
impl<S: ConversationStore + Sync> ConversationStore for Arc<S> {
    fn load(&self) -> Result<Conversations, StoreError> {
        (**self).load()
    }

    fn save(&self, conversations: &Conversations) -> Result<(), StoreError> {
        (**self).save(conversations)
    }
}
