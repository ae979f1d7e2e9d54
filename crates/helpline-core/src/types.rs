use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Classification
// =============================================================================

/// Output of a classifier for a single piece of user text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Predicted category (intent) label.
    pub category: String,
    /// Certainty of the top category, in `[0, 1]`.
    pub confidence: f64,
}

impl Classification {
    pub fn new(category: impl Into<String>, confidence: f64) -> Self {
        Self {
            category: category.into(),
            confidence,
        }
    }
}

// =============================================================================
// Conversation state
// =============================================================================

/// One recorded exchange in a user's history.
///
/// Field names match the durable conversation file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    /// Raw user input.
    pub user: String,
    /// Category predicted for the input, trusted or not.
    pub intent: String,
    /// Reply that was sent back.
    pub bot: String,
    /// When the turn was recorded. Absent in files written before timestamps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl TurnRecord {
    pub fn new(user: impl Into<String>, intent: impl Into<String>, bot: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            intent: intent.into(),
            bot: bot.into(),
            timestamp: None,
        }
    }

    /// Stamp the record with the given time.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Per-user dialogue state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserState {
    /// Chronological, append-only turn log.
    #[serde(default)]
    pub history: Vec<TurnRecord>,
    /// Category of the most recent turn.
    #[serde(default)]
    pub last_intent: Option<String>,
    /// Reserved for structured extraction. Carried through persistence untouched.
    #[serde(default)]
    pub slots: BTreeMap<String, serde_json::Value>,
}

impl UserState {
    /// Record a turn and make its category the current topic.
    pub fn record(&mut self, turn: TurnRecord) {
        self.last_intent = Some(turn.intent.clone());
        self.history.push(turn);
    }

    pub fn turn_count(&self) -> usize {
        self.history.len()
    }
}

/// Every known user's state, keyed by user identifier.
pub type Conversations = BTreeMap<String, UserState>;
