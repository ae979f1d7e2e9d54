//! Classifier adapters.
//!
//! - `PatternClassifier` scores user text against labelled example
//!   utterances by token overlap. It stands in for a trained model and reads
//!   the same dataset the model would be trained on.
//! - `ScriptedClassifier` replays a fixed sequence of predictions for tests.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use regex::Regex;
use tracing::{debug, info};

use helpline_core::Classification;

use crate::dataset::parse_category_lists;
use crate::error::ClassifierError;

/// Maps free text to a `(category, confidence)` prediction.
pub trait Classifier: Send + Sync {
    /// Predict the most likely category for `text`.
    fn classify(&self, text: &str) -> Result<Classification, ClassifierError>;

    /// Every label this classifier can emit, when known.
    fn labels(&self) -> Vec<String> {
        Vec::new()
    }
}

fn word_regex() -> &'static Regex {
    static WORD: OnceLock<Regex> = OnceLock::new();
    WORD.get_or_init(|| Regex::new(r"[\p{L}\p{N}']+").expect("word regex is valid"))
}

fn tokenize(text: &str, min_len: usize) -> BTreeSet<String> {
    let lowered = text.to_lowercase();
    word_regex()
        .find_iter(&lowered)
        .map(|m| m.as_str().trim_matches('\'').to_string())
        .filter(|token| token.chars().count() >= min_len)
        .collect()
}

// =============================================================================
// PatternClassifier
// =============================================================================

/// Token-overlap classifier over a labelled dataset.
///
/// For each category the score is the best, over its example utterances, of
/// the share of input tokens that the example also contains. The top score is
/// reported as the confidence, so it always lies in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct PatternClassifier {
    patterns: BTreeMap<String, Vec<BTreeSet<String>>>,
    min_token_len: usize,
}

impl PatternClassifier {
    /// Build a classifier from category -> example utterances.
    pub fn new(
        dataset: BTreeMap<String, Vec<String>>,
        min_token_len: usize,
    ) -> Result<Self, ClassifierError> {
        let patterns: BTreeMap<String, Vec<BTreeSet<String>>> = dataset
            .into_iter()
            .map(|(label, examples)| {
                let token_sets = examples
                    .iter()
                    .map(|example| tokenize(example, min_token_len))
                    .filter(|tokens| !tokens.is_empty())
                    .collect::<Vec<_>>();
                (label, token_sets)
            })
            .filter(|(_, token_sets)| !token_sets.is_empty())
            .collect();

        if patterns.is_empty() {
            return Err(ClassifierError::Unavailable(
                "dataset has no usable example utterances".to_string(),
            ));
        }

        Ok(Self {
            patterns,
            min_token_len,
        })
    }

    /// Parse a dataset in either the map or the tagged-record shape.
    pub fn from_json_str(json: &str, min_token_len: usize) -> Result<Self, ClassifierError> {
        let dataset = parse_category_lists(json)
            .map_err(|e| ClassifierError::Unavailable(format!("invalid dataset: {}", e)))?;
        Self::new(dataset, min_token_len)
    }

    /// Load a dataset file.
    pub fn load(path: &Path, min_token_len: usize) -> Result<Self, ClassifierError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClassifierError::Unavailable(format!("failed to read {}: {}", path.display(), e))
        })?;
        let classifier = Self::from_json_str(&content, min_token_len)?;
        info!(
            path = %path.display(),
            labels = classifier.patterns.len(),
            "Pattern classifier loaded"
        );
        Ok(classifier)
    }

    fn score(input: &BTreeSet<String>, example: &BTreeSet<String>) -> f64 {
        let shared = input.intersection(example).count();
        shared as f64 / input.len() as f64
    }
}

impl Classifier for PatternClassifier {
    fn classify(&self, text: &str) -> Result<Classification, ClassifierError> {
        if text.trim().is_empty() {
            return Err(ClassifierError::InvalidInput("text is empty".to_string()));
        }

        let input = tokenize(text, self.min_token_len);
        let mut best: Option<(&str, f64)> = None;
        for (label, examples) in &self.patterns {
            let score = if input.is_empty() {
                0.0
            } else {
                examples
                    .iter()
                    .map(|example| Self::score(&input, example))
                    .fold(0.0, f64::max)
            };
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((label.as_str(), score));
            }
        }

        let (category, confidence) = best.ok_or_else(|| {
            ClassifierError::Unavailable("classifier has no labels".to_string())
        })?;
        debug!(category, confidence, "Text classified");
        Ok(Classification::new(category, confidence))
    }

    fn labels(&self) -> Vec<String> {
        self.patterns.keys().cloned().collect()
    }
}

// =============================================================================
// ScriptedClassifier
// =============================================================================

/// Returns pre-set predictions in order, regardless of the input text.
///
/// Fails with `ClassifierError::Unavailable` once the script is exhausted.
#[derive(Debug, Default)]
pub struct ScriptedClassifier {
    script: Mutex<VecDeque<Result<Classification, String>>>,
}

impl ScriptedClassifier {
    pub fn new<I, S>(predictions: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let script = predictions
            .into_iter()
            .map(|(category, confidence)| Ok(Classification::new(category, confidence)))
            .collect();
        Self {
            script: Mutex::new(script),
        }
    }

    /// Queue another prediction.
    pub fn push(&self, category: impl Into<String>, confidence: f64) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Ok(Classification::new(category, confidence)));
        }
    }

    /// Queue a failure.
    pub fn push_failure(&self, reason: impl Into<String>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Err(reason.into()));
        }
    }

    /// Predictions not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl Classifier for ScriptedClassifier {
    fn classify(&self, _text: &str) -> Result<Classification, ClassifierError> {
        let mut script = self
            .script
            .lock()
            .map_err(|e| ClassifierError::Unavailable(format!("script lock poisoned: {}", e)))?;
        match script.pop_front() {
            Some(Ok(classification)) => Ok(classification),
            Some(Err(reason)) => Err(ClassifierError::Unavailable(reason)),
            None => Err(ClassifierError::Unavailable(
                "scripted predictions exhausted".to_string(),
            )),
        }
    }
}
