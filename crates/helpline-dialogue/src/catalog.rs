//! Response catalog: category -> candidate replies.
//!
//! Loaded once at startup and read-only afterwards. Editing the catalog is
//! done offline against the JSON source.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::info;

use crate::dataset::parse_category_lists;
use crate::error::CatalogError;

/// Immutable mapping from category to a non-empty ordered list of replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseCatalog {
    entries: BTreeMap<String, Vec<String>>,
}

impl ResponseCatalog {
    /// Build a catalog, rejecting any category without replies.
    pub fn from_map(entries: BTreeMap<String, Vec<String>>) -> Result<Self, CatalogError> {
        if let Some((category, _)) = entries.iter().find(|(_, replies)| replies.is_empty()) {
            return Err(CatalogError::EmptyCategory(category.clone()));
        }
        Ok(Self { entries })
    }

    /// Parse a catalog from JSON in either the map or the tagged-record shape.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        Self::from_map(parse_category_lists(json)?)
    }

    /// Load a catalog from a JSON file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json_str(&content)?;
        info!(
            path = %path.display(),
            categories = catalog.len(),
            "Response catalog loaded"
        );
        Ok(catalog)
    }

    /// Candidate replies for `category`.
    pub fn get(&self, category: &str) -> Result<&[String], CatalogError> {
        self.entries
            .get(category)
            .map(Vec::as_slice)
            .ok_or_else(|| CatalogError::UnknownCategory(category.to_string()))
    }

    pub fn contains(&self, category: &str) -> bool {
        self.entries.contains_key(category)
    }

    /// Category names in sorted order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Labels from `labels` that have no catalog entry.
    pub fn missing<'a>(&self, labels: &'a [String]) -> Vec<&'a str> {
        labels
            .iter()
            .filter(|label| !self.contains(label))
            .map(String::as_str)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
