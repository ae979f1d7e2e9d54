//! Parsing of category -> string-list JSON files.
//!
//! Both the response catalog and the classifier dataset come in one of two
//! shapes: a plain object mapping each category to its list, or the legacy
//! list of `{"tag": ..., "patterns": [...]}` records. Both normalize to the
//! same ordered map.

use std::collections::BTreeMap;

use serde::Deserialize;

/// A legacy dataset record.
#[derive(Debug, Deserialize)]
struct TaggedRecord {
    tag: String,
    #[serde(default)]
    patterns: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawLists {
    Map(BTreeMap<String, Vec<String>>),
    Tagged(Vec<TaggedRecord>),
}

/// Parse either accepted shape into category -> list.
///
/// Repeated tags in the legacy shape are merged in file order.
pub fn parse_category_lists(json: &str) -> Result<BTreeMap<String, Vec<String>>, serde_json::Error> {
    let lists = match serde_json::from_str::<RawLists>(json)? {
        RawLists::Map(map) => map,
        RawLists::Tagged(records) => {
            let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for record in records {
                map.entry(record.tag).or_default().extend(record.patterns);
            }
            map
        }
    };
    Ok(lists)
}
