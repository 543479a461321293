//! Diff output types.
//!
//! Serialized shape per field: `{"new": v}` for a record never stored,
//! `{"original": a, "updated": b}` for a changed stored field, and
//! `{"<index>": {...}}` for related records.

use crate::path::PathKey;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Change {
    New { new: Value },
    Updated { original: Value, updated: Value },
    /// Diffs of related records; a single-valued relation sits at index 0
    Related(BTreeMap<PathKey, Diff>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Diff(BTreeMap<String, Change>);

impl Diff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, change: Change) {
        self.0.insert(field.into(), change);
    }

    pub fn get(&self, field: &str) -> Option<&Change> {
        self.0.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Change)> {
        self.0.iter()
    }

    /// Copy in every entry of `other` not already present
    pub fn absorb(&mut self, other: Diff) {
        for (field, change) in other.0 {
            self.0.entry(field).or_insert(change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialized_shapes() {
        let mut child = Diff::new();
        child.insert("body", Change::New { new: json!("hi") });

        let mut diff = Diff::new();
        diff.insert(
            "title",
            Change::Updated {
                original: json!("A"),
                updated: json!("B"),
            },
        );
        diff.insert(
            "comments",
            Change::Related(BTreeMap::from([(PathKey::Index(0), child)])),
        );

        assert_eq!(
            serde_json::to_value(&diff).unwrap(),
            json!({
                "title": {"original": "A", "updated": "B"},
                "comments": {"0": {"body": {"new": "hi"}}},
            })
        );
    }

    #[test]
    fn test_absorb_keeps_existing_entries() {
        let mut a = Diff::new();
        a.insert("title", Change::New { new: json!("A") });
        let mut b = Diff::new();
        b.insert("title", Change::New { new: json!("B") });
        b.insert("author_id", Change::New { new: json!(3) });

        a.absorb(b);
        assert_eq!(a.get("title"), Some(&Change::New { new: json!("A") }));
        assert!(a.contains("author_id"));
    }
}
