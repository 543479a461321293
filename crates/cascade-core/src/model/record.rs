//! A live record: attributes, snapshot, and per-pass engine state

use super::record_type::RecordType;
use super::value::{self, is_scalar, Attributes, Payload};
use crate::diff::Diff;
use crate::error_tree::ErrorTree;
use crate::errors::CascadeError;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Engine bookkeeping keys; never hydrated from input and never diffed
pub const BOOKKEEPING_FIELDS: [&str; 2] = ["_hydrated", "_validated"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidationState {
    #[default]
    Unvalidated,
    Validating,
    Valid,
    Invalid,
}

/// Related records loaded by a cascade
#[derive(Debug, Clone)]
pub enum Related {
    One(Box<Record>),
    Many(Vec<Record>),
}

impl Related {
    pub fn records(&self) -> Vec<&Record> {
        match self {
            Related::One(r) => vec![r.as_ref()],
            Related::Many(rs) => rs.iter().collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Record {
    record_type: Arc<RecordType>,
    attributes: Attributes,
    /// Snapshot taken at load or last write; `None` for a record never stored
    original: Option<Attributes>,
    exists: bool,
    errors: ErrorTree,
    diff: Diff,
    relations: BTreeMap<String, Related>,
    state: ValidationState,
    hydrated: bool,
    validated: bool,
    failure: Option<CascadeError>,
}

impl Record {
    pub fn new(record_type: Arc<RecordType>) -> Self {
        Self {
            record_type,
            attributes: Attributes::new(),
            original: None,
            exists: false,
            errors: ErrorTree::new(),
            diff: Diff::default(),
            relations: BTreeMap::new(),
            state: ValidationState::Unvalidated,
            hydrated: false,
            validated: false,
            failure: None,
        }
    }

    /// A record as read back from storage
    pub fn from_storage(record_type: Arc<RecordType>, attributes: Attributes) -> Self {
        let mut record = Self::new(record_type);
        record.original = Some(attributes.clone());
        record.attributes = attributes;
        record.exists = true;
        record
    }

    /// Storage-compatible timestamp for `at`, or for now
    pub fn timestamp(at: Option<DateTime<Utc>>) -> String {
        value::timestamp(at)
    }

    pub fn record_type(&self) -> &Arc<RecordType> {
        &self.record_type
    }

    pub fn type_name(&self) -> &str {
        &self.record_type.name
    }

    pub fn table(&self) -> &str {
        &self.record_type.table
    }

    pub fn key_name(&self) -> &str {
        self.record_type.key_name()
    }

    /// Primary key value, if set and not null
    pub fn key(&self) -> Option<&Value> {
        self.get(self.key_name()).filter(|v| !v.is_null())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.attributes.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(field.into(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.attributes.remove(field)
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn original(&self) -> Option<&Attributes> {
        self.original.as_ref()
    }

    pub fn original_value(&self, field: &str) -> Option<&Value> {
        self.original.as_ref().and_then(|o| o.get(field))
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    /// Assign every fillable, non-bookkeeping field of `data`
    ///
    /// Returns how many fields were assigned.
    pub fn fill(&mut self, data: &Payload) -> usize {
        let mut assigned = 0;
        for (field, value) in data {
            if BOOKKEEPING_FIELDS.contains(&field.as_str()) || !self.record_type.is_fillable(field)
            {
                continue;
            }
            self.attributes.insert(field.clone(), value.clone());
            assigned += 1;
        }
        assigned
    }

    pub fn errors(&self) -> &ErrorTree {
        &self.errors
    }

    pub fn diff(&self) -> &Diff {
        &self.diff
    }

    pub fn state(&self) -> ValidationState {
        self.state
    }

    /// Why the most recent engine call on this record returned `false`
    pub fn failure(&self) -> Option<&CascadeError> {
        self.failure.as_ref()
    }

    pub fn relation(&self, name: &str) -> Option<&Related> {
        self.relations.get(name)
    }

    pub fn relations(&self) -> &BTreeMap<String, Related> {
        &self.relations
    }

    pub(crate) fn errors_mut(&mut self) -> &mut ErrorTree {
        &mut self.errors
    }

    pub(crate) fn set_errors(&mut self, errors: ErrorTree) {
        self.errors = errors;
    }

    pub(crate) fn diff_mut(&mut self) -> &mut Diff {
        &mut self.diff
    }

    pub(crate) fn set_diff(&mut self, diff: Diff) {
        self.diff = diff;
    }

    pub(crate) fn set_state(&mut self, state: ValidationState) {
        self.state = state;
    }

    pub(crate) fn set_failure(&mut self, failure: Option<CascadeError>) {
        self.failure = failure;
    }

    pub(crate) fn set_relation(&mut self, name: impl Into<String>, related: Related) {
        self.relations.insert(name.into(), related);
    }

    pub(crate) fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    pub(crate) fn mark_hydrated(&mut self) {
        self.hydrated = true;
    }

    pub(crate) fn is_validated(&self) -> bool {
        self.validated
    }

    pub(crate) fn mark_validated(&mut self) {
        self.validated = true;
    }

    pub(crate) fn clear_pass_flags(&mut self) {
        self.hydrated = false;
        self.validated = false;
    }

    /// Drop arrays and objects from the attribute map; returns the dropped names
    pub(crate) fn strip_non_scalar(&mut self) -> Vec<String> {
        let dropped: Vec<String> = self
            .attributes
            .iter()
            .filter(|(_, v)| !is_scalar(v))
            .map(|(k, _)| k.clone())
            .collect();
        for field in &dropped {
            self.attributes.remove(field);
        }
        dropped
    }

    /// The record now matches its stored row
    pub(crate) fn mark_persisted(&mut self) {
        self.exists = true;
        self.original = Some(self.attributes.clone());
    }

    pub(crate) fn mark_removed(&mut self) {
        self.exists = false;
    }
}
