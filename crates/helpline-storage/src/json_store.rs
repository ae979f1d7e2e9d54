//! JSON file persistence.
//!
//! The store is a single pretty-printed JSON object keyed by user id. Saves
//! write a sibling temp file and rename it over the target so readers never
//! observe a half-written store.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use helpline_core::Conversations;

use crate::error::StoreError;
use crate::ConversationStore;

/// Conversation store backed by one JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "conversation_state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ConversationStore for JsonFileStore {
    fn load(&self) -> Result<Conversations, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No conversation state yet, starting empty");
                return Ok(Conversations::new());
            }
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };

        if content.trim().is_empty() {
            info!(path = %self.path.display(), "Conversation state is empty, starting empty");
            return Ok(Conversations::new());
        }

        let conversations: Conversations = serde_json::from_str(&content)?;
        info!(
            path = %self.path.display(),
            users = conversations.len(),
            "Conversation state loaded"
        );
        Ok(conversations)
    }

    fn save(&self, conversations: &Conversations) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
            }
        }

        let content = serde_json::to_string_pretty(conversations)?;
        let tmp = self.temp_path();
        fs::write(&tmp, content.as_bytes()).map_err(|e| StoreError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| StoreError::io(&self.path, e))?;

        debug!(
            path = %self.path.display(),
            users = conversations.len(),
            bytes = content.len(),
            "Conversation state saved"
        );
        Ok(())
    }
}
