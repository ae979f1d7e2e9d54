//! Dialogue engine: classification, confidence policy, reply selection and
//! state persistence for one turn.
//!
//! The engine owns the in-memory conversation store and performs no locking.
//! Hosts that serve concurrent requests must serialize calls (one lock around
//! the whole engine is enough, since every save rewrites the full store).

use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use helpline_core::config::DialogueConfig;
use helpline_core::{Classification, Conversations, TurnRecord, UserState};
use helpline_storage::ConversationStore;

use crate::catalog::ResponseCatalog;
use crate::classifier::Classifier;
use crate::error::{ClassifierError, DialogueError};

/// How replies are chosen from a prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyPolicy {
    /// Predictions below this confidence get `clarification_message`.
    pub confidence_threshold: f64,
    pub clarification_message: String,
    /// Prefix for a topic change. `{category}` is replaced by the category.
    pub intro_template: String,
}

impl Default for ReplyPolicy {
    fn default() -> Self {
        Self::from(&DialogueConfig::default())
    }
}

impl From<&DialogueConfig> for ReplyPolicy {
    fn from(config: &DialogueConfig) -> Self {
        Self {
            confidence_threshold: config.confidence_threshold,
            clarification_message: config.clarification_message.clone(),
            intro_template: config.intro_template.clone(),
        }
    }
}

impl ReplyPolicy {
    fn introduction(&self, category: &str) -> String {
        self.intro_template.replace("{category}", category)
    }
}

/// Everything produced by one call to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub user_id: String,
    pub input: String,
    pub category: String,
    pub confidence: f64,
    pub reply: String,
    /// True when the confidence was below the threshold.
    pub clarified: bool,
}

/// Selects replies and keeps per-user dialogue state.
pub struct DialogueEngine {
    classifier: Box<dyn Classifier>,
    catalog: ResponseCatalog,
    store: Box<dyn ConversationStore>,
    conversations: Conversations,
    policy: ReplyPolicy,
    rng: StdRng,
}

impl std::fmt::Debug for DialogueEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogueEngine")
            .field("categories", &self.catalog.len())
            .field("users", &self.conversations.len())
            .field("policy", &self.policy)
            .finish()
    }
}

impl DialogueEngine {
    /// Create an engine, loading existing conversation state from `store`.
    pub fn new(
        classifier: Box<dyn Classifier>,
        catalog: ResponseCatalog,
        store: Box<dyn ConversationStore>,
        policy: ReplyPolicy,
        rng: StdRng,
    ) -> Result<Self, DialogueError> {
        check_threshold(policy.confidence_threshold)?;
        let conversations = store.load()?;
        info!(
            users = conversations.len(),
            categories = catalog.len(),
            threshold = policy.confidence_threshold,
            "Dialogue engine ready"
        );
        Ok(Self {
            classifier,
            catalog,
            store,
            conversations,
            policy,
            rng,
        })
    }

    /// Seeded generator when `seed` is set, OS entropy otherwise.
    pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }

    /// Reply to `text` from `user_id` using the policy's threshold.
    pub fn reply(&mut self, user_id: &str, text: &str) -> Result<String, DialogueError> {
        let threshold = self.policy.confidence_threshold;
        self.reply_with_threshold(user_id, text, threshold)
    }

    /// Reply to `text` from `user_id` with a per-call confidence threshold.
    pub fn reply_with_threshold(
        &mut self,
        user_id: &str,
        text: &str,
        confidence_threshold: f64,
    ) -> Result<String, DialogueError> {
        self.respond(user_id, text, confidence_threshold)
            .map(|turn| turn.reply)
    }

    /// Run one full turn and return everything it produced.
    ///
    /// On `InvalidThreshold`, `UnknownCategory` and classifier errors nothing
    /// is recorded or persisted. On `Persistence` the turn is already recorded
    /// in memory.
    pub fn respond(
        &mut self,
        user_id: &str,
        text: &str,
        confidence_threshold: f64,
    ) -> Result<Turn, DialogueError> {
        check_threshold(confidence_threshold)?;
        let Classification {
            category,
            confidence,
        } = self.classifier.classify(text)?;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ClassifierError::InvalidConfidence {
                category,
                confidence,
            }
            .into());
        }

        let last_intent = self
            .conversations
            .get(user_id)
            .and_then(|state| state.last_intent.as_deref());

        let clarified = confidence < confidence_threshold;
        let reply = if clarified {
            warn!(
                user_id,
                category = %category,
                confidence,
                threshold = confidence_threshold,
                "Low-confidence prediction, asking for clarification"
            );
            self.policy.clarification_message.clone()
        } else {
            let candidates = self
                .catalog
                .get(&category)
                .map_err(|_| DialogueError::UnknownCategory(category.clone()))?;
            let choice = candidates
                .choose(&mut self.rng)
                .ok_or_else(|| DialogueError::UnknownCategory(category.clone()))?;
            if last_intent == Some(category.as_str()) {
                choice.clone()
            } else {
                format!("{}{}", self.policy.introduction(&category), choice)
            }
        };

        // A clarification still moves the topic to the untrusted category.
        self.conversations
            .entry(user_id.to_string())
            .or_default()
            .record(TurnRecord::new(text, category.clone(), reply.clone()).at(Utc::now()));

        debug!(user_id, category = %category, confidence, clarified, "Turn recorded");

        self.store.save(&self.conversations)?;

        Ok(Turn {
            user_id: user_id.to_string(),
            input: text.to_string(),
            category,
            confidence,
            reply,
            clarified,
        })
    }

    pub fn user_state(&self, user_id: &str) -> Option<&UserState> {
        self.conversations.get(user_id)
    }

    pub fn conversations(&self) -> &Conversations {
        &self.conversations
    }

    pub fn user_count(&self) -> usize {
        self.conversations.len()
    }

    pub fn catalog(&self) -> &ResponseCatalog {
        &self.catalog
    }

    pub fn policy(&self) -> &ReplyPolicy {
        &self.policy
    }

    /// Labels the classifier can emit that the catalog does not cover.
    pub fn uncovered_labels(&self) -> Vec<String> {
        let labels = self.classifier.labels();
        self.catalog
            .missing(&labels)
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

/// NaN fails the range check, so it cannot disable clarification.
fn check_threshold(threshold: f64) -> Result<(), DialogueError> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(DialogueError::InvalidThreshold(threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use helpline_storage::{JsonFileStore, MemoryStore};

    use crate::classifier::ScriptedClassifier;

    const CLARIFY: &str = "I'm not sure I understand. Can you clarify your issue?";

    fn catalog() -> ResponseCatalog {
        let mut entries = BTreeMap::new();
        entries.insert(
            "network_issue".to_string(),
            vec!["Please restart your router.".to_string()],
        );
        entries.insert(
            "billing".to_string(),
            vec![
                "You can check your balance in the app.".to_string(),
                "Your invoice is under Account > Billing.".to_string(),
                "Dial *123# to see your balance.".to_string(),
            ],
        );
        ResponseCatalog::from_map(entries).unwrap()
    }

    fn engine_with(
        predictions: Vec<(&str, f64)>,
        store: Arc<MemoryStore>,
        seed: u64,
    ) -> DialogueEngine {
        DialogueEngine::new(
            Box::new(ScriptedClassifier::new(predictions)),
            catalog(),
            Box::new(store),
            ReplyPolicy::default(),
            StdRng::seed_from_u64(seed),
        )
        .unwrap()
    }

    fn make_engine(predictions: Vec<(&str, f64)>) -> (DialogueEngine, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (engine_with(predictions, Arc::clone(&store), 42), store)
    }

    #[test]
    fn test_first_turn_introduces_category() {
        let (mut engine, _) = make_engine(vec![("network_issue", 0.9)]);
        let reply = engine.reply("u1", "slow internet").unwrap();
        assert_eq!(
            reply,
            "I see you have a network_issue issue. Please restart your router."
        );
        assert_eq!(
            engine.user_state("u1").unwrap().last_intent.as_deref(),
            Some("network_issue")
        );
    }

    #[test]
    fn test_same_category_drops_introduction() {
        let (mut engine, _) = make_engine(vec![("network_issue", 0.9), ("network_issue", 0.95)]);
        engine.reply("u1", "slow internet").unwrap();
        let reply = engine.reply("u1", "still slow").unwrap();
        assert_eq!(reply, "Please restart your router.");
    }

    #[test]
    fn test_low_confidence_clarifies_and_masks_topic() {
        let (mut engine, _) = make_engine(vec![("billing", 0.3)]);
        let turn = engine.respond("u1", "gibberish", 0.6).unwrap();
        assert_eq!(turn.reply, CLARIFY);
        assert!(turn.clarified);
        let state = engine.user_state("u1").unwrap();
        assert_eq!(state.last_intent.as_deref(), Some("billing"));
        assert_eq!(state.history[0].intent, "billing");
        assert_eq!(state.history[0].bot, CLARIFY);
    }

    #[test]
    fn test_clarification_masks_prior_topic_on_next_turn() {
        let (mut engine, _) = make_engine(vec![
            ("network_issue", 0.9),
            ("billing", 0.2),
            ("network_issue", 0.9),
        ]);
        engine.reply("u1", "slow internet").unwrap();
        assert_eq!(engine.reply("u1", "hmm").unwrap(), CLARIFY);
        let reply = engine.reply("u1", "internet still slow").unwrap();
        assert!(reply.starts_with("I see you have a network_issue issue. "));
    }

    #[test]
    fn test_low_confidence_for_any_category() {
        for category in ["billing", "network_issue", "not_in_catalog"] {
            let (mut engine, _) = make_engine(vec![(category, 0.59)]);
            assert_eq!(engine.reply("u", "x").unwrap(), CLARIFY);
        }
    }

    #[test]
    fn test_threshold_boundary_is_inclusive() {
        let (mut engine, _) = make_engine(vec![("network_issue", 0.6)]);
        let turn = engine.respond("u1", "x", 0.6).unwrap();
        assert!(!turn.clarified);
    }

    #[test]
    fn test_per_call_threshold_override() {
        let (mut engine, _) = make_engine(vec![("network_issue", 0.7), ("network_issue", 0.7)]);
        assert_eq!(engine.reply_with_threshold("u1", "x", 0.8).unwrap(), CLARIFY);
        assert_eq!(
            engine.reply_with_threshold("u1", "x", 0.5).unwrap(),
            "Please restart your router."
        );
    }

    #[test]
    fn test_reply_is_catalog_member() {
        let predictions = vec![("billing", 0.99); 20];
        let (mut engine, _) = make_engine(predictions);
        let replies = catalog().get("billing").unwrap().to_vec();
        let prefix = "I see you have a billing issue. ";

        let first = engine.reply("u1", "balance").unwrap();
        assert!(replies.iter().any(|r| first == format!("{}{}", prefix, r)));
        for _ in 0..19 {
            let reply = engine.reply("u1", "balance").unwrap();
            assert!(replies.contains(&reply), "unexpected reply {}", reply);
        }
    }

    #[test]
    fn test_same_seed_same_replies() {
        let predictions = vec![("billing", 0.9); 10];
        let (mut a, _) = make_engine(predictions.clone());
        let (mut b, _) = make_engine(predictions);
        for _ in 0..10 {
            assert_eq!(a.reply("u", "x").unwrap(), b.reply("u", "x").unwrap());
        }
    }

    #[test]
    fn test_history_grows_in_call_order() {
        let (mut engine, store) = make_engine(vec![
            ("network_issue", 0.9),
            ("billing", 0.8),
            ("billing", 0.1),
        ]);
        let inputs = ["first", "second", "third"];
        for input in inputs {
            engine.reply("u1", input).unwrap();
        }
        let state = engine.user_state("u1").unwrap();
        assert_eq!(state.turn_count(), 3);
        let recorded: Vec<&str> = state.history.iter().map(|t| t.user.as_str()).collect();
        assert_eq!(recorded, inputs);
        assert!(state.history.iter().all(|t| t.timestamp.is_some()));
        assert_eq!(store.save_count(), 3);
    }

    #[test]
    fn test_users_are_independent() {
        let (mut engine, _) = make_engine(vec![("network_issue", 0.9), ("network_issue", 0.9)]);
        engine.reply("alice", "x").unwrap();
        let reply = engine.reply("bob", "x").unwrap();
        assert!(reply.starts_with("I see you have a network_issue issue. "));
        assert_eq!(engine.user_count(), 2);
    }

    #[test]
    fn test_unknown_category_is_configuration_error_without_side_effects() {
        let (mut engine, store) = make_engine(vec![("refunds", 0.95)]);
        let err = engine.reply("u1", "give me my money").unwrap_err();
        assert!(matches!(err, DialogueError::UnknownCategory(ref c) if c == "refunds"));
        assert!(engine.user_state("u1").is_none());
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn test_unknown_category_keeps_existing_state_untouched() {
        let (mut engine, store) = make_engine(vec![("billing", 0.9), ("refunds", 0.95)]);
        engine.reply("u1", "balance").unwrap();
        let before = engine.user_state("u1").unwrap().clone();
        assert!(engine.reply("u1", "refund").is_err());
        assert_eq!(engine.user_state("u1").unwrap(), &before);
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn test_classifier_error_propagates() {
        let classifier = ScriptedClassifier::default();
        classifier.push_failure("model unavailable");
        let store = Arc::new(MemoryStore::new());
        let mut engine = DialogueEngine::new(
            Box::new(classifier),
            catalog(),
            Box::new(Arc::clone(&store)),
            ReplyPolicy::default(),
            StdRng::seed_from_u64(1),
        )
        .unwrap();

        let err = engine.reply("u1", "hello").unwrap_err();
        assert!(matches!(err, DialogueError::Classifier(_)));
        assert!(engine.user_state("u1").is_none());
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn test_out_of_range_confidence_rejected() {
        let (mut engine, _) = make_engine(vec![("billing", 1.2)]);
        let err = engine.reply("u1", "x").unwrap_err();
        assert!(matches!(
            err,
            DialogueError::Classifier(ClassifierError::InvalidConfidence { .. })
        ));

        let (mut engine, _) = make_engine(vec![("billing", f64::NAN)]);
        let err = engine.reply("u1", "x").unwrap_err();
        assert!(matches!(
            err,
            DialogueError::Classifier(ClassifierError::InvalidConfidence { .. })
        ));
    }

    #[test]
    fn test_invalid_per_call_threshold_rejected_without_side_effects() {
        for threshold in [f64::NAN, -0.1, 1.5, f64::INFINITY] {
            let (mut engine, store) = make_engine(vec![("network_issue", 0.05)]);
            let err = engine.reply_with_threshold("u1", "x", threshold).unwrap_err();
            assert!(matches!(err, DialogueError::InvalidThreshold(_)));
            assert!(engine.user_state("u1").is_none());
            assert_eq!(store.save_count(), 0);

            // The queued prediction was not consumed.
            assert_eq!(engine.reply("u1", "x").unwrap(), CLARIFY);
        }
    }

    #[test]
    fn test_invalid_policy_threshold_rejected_at_construction() {
        let policy = ReplyPolicy {
            confidence_threshold: f64::NAN,
            ..ReplyPolicy::default()
        };
        let err = DialogueEngine::new(
            Box::new(ScriptedClassifier::default()),
            catalog(),
            Box::new(MemoryStore::new()),
            policy,
            StdRng::seed_from_u64(1),
        )
        .unwrap_err();
        assert!(matches!(err, DialogueError::InvalidThreshold(t) if t.is_nan()));
    }

    #[test]
    fn test_persistence_failure_reported_after_mutation() {
        let (mut engine, store) = make_engine(vec![("network_issue", 0.9)]);
        store.set_fail_saves(true);
        let err = engine.reply("u1", "slow").unwrap_err();
        assert!(matches!(err, DialogueError::Persistence(_)));
        assert_eq!(engine.user_state("u1").unwrap().turn_count(), 1);
        assert!(store.snapshot().unwrap().is_empty());
    }

    #[test]
    fn test_every_turn_persists_full_store() {
        let (mut engine, store) = make_engine(vec![("network_issue", 0.9), ("billing", 0.9)]);
        engine.reply("alice", "x").unwrap();
        engine.reply("bob", "y").unwrap();
        assert_eq!(&store.snapshot().unwrap(), engine.conversations());
    }

    #[test]
    fn test_state_survives_restart_through_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conversation_state.json");

        let mut first = DialogueEngine::new(
            Box::new(ScriptedClassifier::new([("network_issue", 0.9)])),
            catalog(),
            Box::new(JsonFileStore::new(&path)),
            ReplyPolicy::default(),
            StdRng::seed_from_u64(3),
        )
        .unwrap();
        first.reply("user123", "My internet is very slow today").unwrap();

        let mut second = DialogueEngine::new(
            Box::new(ScriptedClassifier::new([("network_issue", 0.95)])),
            catalog(),
            Box::new(JsonFileStore::new(&path)),
            ReplyPolicy::default(),
            StdRng::seed_from_u64(3),
        )
        .unwrap();
        assert_eq!(second.user_count(), 1);
        let reply = second
            .reply("user123", "It's not connecting at all now")
            .unwrap();
        assert_eq!(reply, "Please restart your router.");
        assert_eq!(second.user_state("user123").unwrap().turn_count(), 2);
    }

    #[test]
    fn test_slots_are_preserved_across_turns() {
        let mut state = UserState::default();
        state
            .slots
            .insert("account".to_string(), serde_json::json!("A-1"));
        let mut seeded = Conversations::new();
        seeded.insert("u1".to_string(), state);
        let store = Arc::new(MemoryStore::with_snapshot(seeded));

        let mut engine = engine_with(vec![("billing", 0.9)], Arc::clone(&store), 5);
        engine.reply("u1", "balance").unwrap();

        let saved = store.snapshot().unwrap();
        assert_eq!(saved["u1"].slots["account"], serde_json::json!("A-1"));
    }

    #[test]
    fn test_custom_policy_templates() {
        let policy = ReplyPolicy {
            confidence_threshold: 0.5,
            clarification_message: "Sorry?".to_string(),
            intro_template: "[{category}] ".to_string(),
        };
        let mut engine = DialogueEngine::new(
            Box::new(ScriptedClassifier::new([("network_issue", 0.55), ("billing", 0.4)])),
            catalog(),
            Box::new(MemoryStore::new()),
            policy,
            StdRng::seed_from_u64(9),
        )
        .unwrap();

        assert_eq!(
            engine.reply("u", "x").unwrap(),
            "[network_issue] Please restart your router."
        );
        assert_eq!(engine.reply("u", "y").unwrap(), "Sorry?");
    }

    #[test]
    fn test_uncovered_labels_empty_for_scripted_classifier() {
        let (engine, _) = make_engine(vec![]);
        assert!(engine.uncovered_labels().is_empty());
    }
}
