use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{HelplineError, Result};

/// Top-level configuration for the Helpline application.
///
/// Loaded from `~/.helpline/config.toml` by default. Every section falls back
/// to its defaults when omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HelplineConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub dialogue: DialogueConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

impl HelplineConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: HelplineConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// `general.log_level` from the file, if it parses, without logging.
    ///
    /// Used to pick the tracing filter before the subscriber exists.
    pub fn peek_log_level(path: &Path) -> Option<String> {
        let content = std::fs::read_to_string(path).ok()?;
        let config: HelplineConfig = toml::from_str(&content).ok()?;
        Some(config.general.log_level)
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Check values that serde cannot constrain on its own.
    pub fn validate(&self) -> Result<()> {
        let threshold = self.dialogue.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(HelplineError::Config(format!(
                "dialogue.confidence_threshold must be within [0, 1], got {}",
                threshold
            )));
        }
        if self.dialogue.clarification_message.trim().is_empty() {
            return Err(HelplineError::Config(
                "dialogue.clarification_message must not be empty".to_string(),
            ));
        }
        if !self.dialogue.intro_template.contains("{category}") {
            return Err(HelplineError::Config(
                "dialogue.intro_template must contain {category}".to_string(),
            ));
        }
        if self.catalog.path.trim().is_empty() {
            return Err(HelplineError::Config("catalog.path must be set".to_string()));
        }
        if self.store.path.trim().is_empty() {
            return Err(HelplineError::Config("store.path must be set".to_string()));
        }
        Ok(())
    }

    /// Absolute data directory with `~` expanded.
    pub fn data_dir(&self) -> PathBuf {
        expand_home(&self.general.data_dir)
    }

    /// Conversation state file. Relative paths live under the data directory.
    pub fn store_path(&self) -> PathBuf {
        self.resolve(&self.store.path)
    }

    /// Response catalog file. Relative paths live under the data directory.
    pub fn catalog_path(&self) -> PathBuf {
        self.resolve(&self.catalog.path)
    }

    /// Classifier dataset file. Relative paths live under the data directory.
    pub fn dataset_path(&self) -> PathBuf {
        self.resolve(&self.classifier.dataset_path)
    }

    fn resolve(&self, raw: &str) -> PathBuf {
        let path = expand_home(raw);
        if path.is_absolute() {
            path
        } else {
            self.data_dir().join(path)
        }
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(rest)
    } else {
        PathBuf::from(raw)
    }
}

/// Resolve the config file path (`HELPLINE_CONFIG` env, or `~/.helpline/config.toml`).
pub fn default_config_path() -> PathBuf {
    if let Ok(p) = std::env::var("HELPLINE_CONFIG") {
        return PathBuf::from(p);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".helpline").join("config.toml");
    }
    PathBuf::from("config.toml")
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding the catalog, dataset and conversation state.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// HTTP port, bound on 127.0.0.1.
    pub port: u16,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.helpline/data".to_string(),
            log_level: "info".to_string(),
            port: 8000,
        }
    }
}

/// Reply selection policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueConfig {
    /// Predictions below this confidence get the clarification message.
    pub confidence_threshold: f64,
    /// Reply used for low-confidence predictions.
    pub clarification_message: String,
    /// Prefix used when the topic changes. `{category}` is substituted.
    pub intro_template: String,
    /// Fixed seed for reply selection. Random per process when unset.
    pub rng_seed: Option<u64>,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.6,
            clarification_message: "I'm not sure I understand. Can you clarify your issue?"
                .to_string(),
            intro_template: "I see you have a {category} issue. ".to_string(),
            rng_seed: None,
        }
    }
}

/// Response catalog source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub path: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: "responses.json".to_string(),
        }
    }
}

/// Conversation state persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "conversation_state.json".to_string(),
        }
    }
}

/// Pattern classifier settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Labelled example utterances, category -> patterns.
    pub dataset_path: String,
    /// Tokens shorter than this are ignored when scoring.
    pub min_token_len: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            dataset_path: "dataset.json".to_string(),
            min_token_len: 2,
        }
    }
}
