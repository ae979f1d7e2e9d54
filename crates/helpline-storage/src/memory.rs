//! In-process conversation store.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use helpline_core::Conversations;

use crate::error::StoreError;
use crate::ConversationStore;

/// Keeps the last saved snapshot in memory.
///
/// Used for ephemeral runs and tests. Saves can be switched to fail so
/// callers can exercise their persistence error paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: Mutex<Conversations>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing snapshot, as if it had been persisted earlier.
    pub fn with_snapshot(conversations: Conversations) -> Self {
        Self {
            snapshot: Mutex::new(conversations),
            ..Self::default()
        }
    }

    /// Make every subsequent save fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Copy of the last saved snapshot.
    pub fn snapshot(&self) -> Result<Conversations, StoreError> {
        self.load()
    }
}

impl ConversationStore for MemoryStore {
    fn load(&self) -> Result<Conversations, StoreError> {
        let snapshot = self
            .snapshot
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("snapshot lock poisoned: {}", e)))?;
        Ok(snapshot.clone())
    }

    fn save(&self, conversations: &Conversations) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("saves disabled".to_string()));
        }
        let mut snapshot = self
            .snapshot
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("snapshot lock poisoned: {}", e)))?;
        *snapshot = conversations.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
