//! Relationship Classifier
//!
//! Decides which keys of an input payload address declared relations of a
//! record type, and with what cardinality.

use crate::model::{Cardinality, Payload, RecordType, RelationKind};
use crate::path::PathKey;
use convert_case::{Case, Casing};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Accessor form of a payload key: `user_profile` resolves to `userProfile`
pub fn accessor_name(key: &str) -> String {
    key.to_case(Case::Camel)
}

/// Which relations a cascade may touch, nested per relation
///
/// ```
/// use cascade_core::relations::Conditions;
///
/// let conditions: Conditions = serde_json::from_value(serde_json::json!({
///     "except": ["tags"],
///     "comments": { "only": ["author"] }
/// })).unwrap();
///
/// assert!(!conditions.allows("tags", "tags"));
/// assert!(conditions.scoped("comments").only.is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "BTreeMap<String, RawCondition>")]
pub struct Conditions {
    /// When set, only these relations are followed
    pub only: Option<Vec<String>>,
    pub except: Vec<String>,
    pub relations: BTreeMap<String, Conditions>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCondition {
    Names(Vec<String>),
    Nested(Conditions),
}

impl From<BTreeMap<String, RawCondition>> for Conditions {
    fn from(raw: BTreeMap<String, RawCondition>) -> Self {
        let mut conditions = Conditions::default();
        for (key, entry) in raw {
            match (key.as_str(), entry) {
                ("only", RawCondition::Names(names)) => conditions.only = Some(names),
                ("except", RawCondition::Names(names)) => conditions.except = names,
                (_, RawCondition::Nested(nested)) => {
                    conditions.relations.insert(key, nested);
                }
                (_, RawCondition::Names(_)) => {}
            }
        }
        conditions
    }
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn only<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn except<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.except.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn relation(mut self, name: impl Into<String>, nested: Conditions) -> Self {
        self.relations.insert(name.into(), nested);
        self
    }

    /// A relation passes when neither its raw key nor its accessor name is
    /// excluded, and, if `only` is set, one of the two is listed there
    pub fn allows(&self, key: &str, accessor: &str) -> bool {
        let listed = |names: &[String]| names.iter().any(|n| n == key || n == accessor);
        if listed(&self.except) {
            return false;
        }
        self.only.as_deref().map_or(true, listed)
    }

    /// Conditions for a relation, looked up by raw then camelCase name
    pub fn scoped(&self, relation: &str) -> Conditions {
        self.relations
            .get(relation)
            .or_else(|| self.relations.get(&accessor_name(relation)))
            .cloned()
            .unwrap_or_default()
    }
}

/// A payload key matched to a declared relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipDescriptor {
    /// Key as it appears in the payload
    pub name: String,
    /// Key of the declared relation
    pub accessor: String,
    pub cardinality: Cardinality,
    pub kind: RelationKind,
}

/// Relations addressed by `data`, in payload key order
///
/// Only keys holding an object or array are candidates. A key matches a
/// declared relation by its raw name or its camelCase form.
pub fn classify(
    record_type: &RecordType,
    data: &Payload,
    conditions: &Conditions,
) -> Vec<RelationshipDescriptor> {
    data.iter()
        .filter(|(_, value)| matches!(value, Value::Object(_) | Value::Array(_)))
        .filter_map(|(key, _)| {
            let camel = accessor_name(key);
            if !conditions.allows(key, &camel) {
                return None;
            }
            let (accessor, relation) = record_type
                .relation(key)
                .map(|r| (key.clone(), r))
                .or_else(|| record_type.relation(&camel).map(|r| (camel.clone(), r)))?;
            Some(RelationshipDescriptor {
                name: key.clone(),
                accessor,
                cardinality: relation.cardinality()?,
                kind: relation.kind,
            })
        })
        .collect()
}

/// The object under `key`, or an empty slice
pub fn slice_of(data: &Payload, key: &str) -> Payload {
    match data.get(key) {
        Some(Value::Object(map)) => map.clone(),
        _ => Payload::new(),
    }
}

/// Indexed elements of a collection payload
///
/// Arrays index by position. Objects index numeric-looking keys by number
/// and keep other keys as names. Non-object elements become empty slices.
pub fn elements_of(data: &Payload, key: &str) -> Vec<(PathKey, Payload)> {
    let as_slice = |v: &Value| v.as_object().cloned().unwrap_or_default();
    match data.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (PathKey::Index(i), as_slice(v)))
            .collect(),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(k, v)| (PathKey::parse(k), as_slice(v)))
            .collect(),
        _ => Vec::new(),
    }
}
