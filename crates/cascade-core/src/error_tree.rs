//! Hierarchical validation messages
//!
//! A record's own field errors sit at the top level. A failed relation adds
//! one entry under its name holding a nested tree: the child's errors
//! directly for a single-valued relation, or one nested tree per failing
//! index for a collection.

use crate::path::PathKey;
use serde::Serialize;
use std::collections::BTreeMap;

/// One entry stored under a key
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ErrorEntry {
    Message(String),
    Nested(ErrorTree),
}

impl From<&str> for ErrorEntry {
    fn from(message: &str) -> Self {
        ErrorEntry::Message(message.to_string())
    }
}

impl From<String> for ErrorEntry {
    fn from(message: String) -> Self {
        ErrorEntry::Message(message)
    }
}

impl From<ErrorTree> for ErrorEntry {
    fn from(tree: ErrorTree) -> Self {
        ErrorEntry::Nested(tree)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ErrorTree {
    entries: BTreeMap<PathKey, Vec<ErrorEntry>>,
}

/// First-error-per-branch view produced by [`ErrorTree::flatten`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Flattened {
    Leaf(String),
    Branch(BTreeMap<String, Flattened>),
}

impl Flattened {
    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            Flattened::Leaf(m) => Some(m),
            Flattened::Branch(_) => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Flattened> {
        match self {
            Flattened::Branch(map) => map.get(key),
            Flattened::Leaf(_) => None,
        }
    }
}

impl ErrorTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of leaf messages, nested trees included
    pub fn count(&self) -> usize {
        self.entries
            .values()
            .flatten()
            .map(|entry| match entry {
                ErrorEntry::Message(_) => 1,
                ErrorEntry::Nested(tree) => tree.count(),
            })
            .sum()
    }

    /// Append a message or subtree under `key`; empty subtrees are ignored
    pub fn add(&mut self, key: impl Into<PathKey>, entry: impl Into<ErrorEntry>) {
        let entry = entry.into();
        if matches!(&entry, ErrorEntry::Nested(tree) if tree.is_empty()) {
            return;
        }
        self.entries.entry(key.into()).or_default().push(entry);
    }

    /// Append every entry of `other`, key by key
    pub fn merge(&mut self, other: ErrorTree) {
        for (key, entries) in other.entries {
            self.entries.entry(key).or_default().extend(entries);
        }
    }

    /// Merge `subtree` into the nested tree stored under `key`, creating it
    /// if the key holds no nested tree yet
    pub fn merge_at(&mut self, key: impl Into<PathKey>, subtree: ErrorTree) {
        if subtree.is_empty() {
            return;
        }
        let slot = self.entries.entry(key.into()).or_default();
        match slot.iter_mut().find_map(|e| match e {
            ErrorEntry::Nested(tree) => Some(tree),
            ErrorEntry::Message(_) => None,
        }) {
            Some(tree) => tree.merge(subtree),
            None => slot.push(ErrorEntry::Nested(subtree)),
        }
    }

    pub fn get(&self, key: &PathKey) -> Option<&[ErrorEntry]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn has(&self, key: impl Into<PathKey>) -> bool {
        self.entries.contains_key(&key.into())
    }

    /// Nested tree under `key`, if its first entry is one
    pub fn subtree(&self, key: impl Into<PathKey>) -> Option<&ErrorTree> {
        self.entries
            .get(&key.into())
            .and_then(|entries| entries.first())
            .and_then(|entry| match entry {
                ErrorEntry::Nested(tree) => Some(tree),
                ErrorEntry::Message(_) => None,
            })
    }

    pub fn keys(&self) -> impl Iterator<Item = &PathKey> {
        self.entries.keys()
    }

    /// Keep the first message reached on every branch
    ///
    /// With `path` (dot separated, e.g. `comments.1`) only that branch is
    /// returned, or `None` if nothing failed there.
    pub fn flatten(&self, path: Option<&str>) -> Option<Flattened> {
        let mut node = Flattened::Branch(self.first_per_branch());
        if let Some(path) = path.filter(|p| !p.is_empty()) {
            for segment in path.split('.') {
                node = match node {
                    Flattened::Branch(mut map) => map.remove(segment)?,
                    Flattened::Leaf(_) => return None,
                };
            }
        }
        Some(node)
    }

    fn first_per_branch(&self) -> BTreeMap<String, Flattened> {
        self.entries
            .iter()
            .filter_map(|(key, entries)| {
                let first = entries.first()?;
                let flat = match first {
                    ErrorEntry::Message(m) => Flattened::Leaf(m.clone()),
                    ErrorEntry::Nested(tree) => Flattened::Branch(tree.first_per_branch()),
                };
                Some((key.to_string(), flat))
            })
            .collect()
    }

    /// Every message with its dot path, depth first in key order
    pub fn messages(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        self.collect_messages(None, &mut out);
        out
    }

    fn collect_messages(&self, prefix: Option<&str>, out: &mut Vec<(String, String)>) {
        for (key, entries) in &self.entries {
            let path = match prefix {
                Some(p) => format!("{}.{}", p, key),
                None => key.to_string(),
            };
            for entry in entries {
                match entry {
                    ErrorEntry::Message(m) => out.push((path.clone(), m.clone())),
                    ErrorEntry::Nested(tree) => tree.collect_messages(Some(&path), out),
                }
            }
        }
    }
}
