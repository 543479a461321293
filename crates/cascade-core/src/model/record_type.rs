//! Declarative schema of a record type

use super::hooks::{Callback, Hook, HookOutcome};
use super::record::Record;
use super::relation::Relation;
use crate::rules::RuleSpec;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// Everything the engines need to know about one kind of record
#[derive(Clone)]
pub struct RecordType {
    /// Type name, e.g. `App\Models\Post`. Also the morph type value and the
    /// message catalog path.
    pub name: String,
    pub table: String,
    /// `None` means the record type declares no primary key; `id` is assumed
    pub primary_key: Option<String>,
    pub fillable: BTreeSet<String>,
    pub hashed: BTreeSet<String>,
    pub diff_ignore: BTreeSet<String>,
    /// Hydrate from caller data during validation
    pub fill_from_input: bool,
    pub soft_delete_column: Option<String>,
    /// Stamp `created_at`/`updated_at` on write
    pub timestamps: bool,
    pub rules: RuleSpec,
    pub language_key: Option<String>,
    /// Overrides the engine's catalog prefix
    pub language_folder: Option<String>,
    pub relations: BTreeMap<String, Relation>,
    hooks: BTreeMap<Hook, Callback>,
}

impl RecordType {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            primary_key: Some(DEFAULT_PRIMARY_KEY.to_string()),
            fillable: BTreeSet::new(),
            hashed: BTreeSet::new(),
            diff_ignore: BTreeSet::new(),
            fill_from_input: true,
            soft_delete_column: None,
            timestamps: false,
            rules: RuleSpec::default(),
            language_key: None,
            language_folder: None,
            relations: BTreeMap::new(),
            hooks: BTreeMap::new(),
        }
    }

    pub fn with_primary_key(mut self, key: impl Into<String>) -> Self {
        self.primary_key = Some(key.into());
        self
    }

    pub fn without_primary_key(mut self) -> Self {
        self.primary_key = None;
        self
    }

    pub fn with_fillable<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fillable.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn with_hashed<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hashed.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn with_diff_ignore<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.diff_ignore.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn without_input_fill(mut self) -> Self {
        self.fill_from_input = false;
        self
    }

    pub fn with_soft_deletes(mut self) -> Self {
        self.soft_delete_column = Some("deleted_at".to_string());
        self
    }

    pub fn with_timestamps(mut self) -> Self {
        self.timestamps = true;
        self
    }

    pub fn with_rules(mut self, rules: RuleSpec) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_language_key(mut self, key: impl Into<String>) -> Self {
        self.language_key = Some(key.into());
        self
    }

    pub fn with_language_folder(mut self, folder: impl Into<String>) -> Self {
        self.language_folder = Some(folder.into());
        self
    }

    pub fn with_relation(mut self, name: impl Into<String>, relation: Relation) -> Self {
        self.relations.insert(name.into(), relation);
        self
    }

    pub fn with_hook<F>(mut self, hook: Hook, callback: F) -> Self
    where
        F: Fn(&mut Record) -> HookOutcome + Send + Sync + 'static,
    {
        self.hooks.insert(hook, Arc::new(callback));
        self
    }

    /// Primary key column, `id` when none is declared
    pub fn key_name(&self) -> &str {
        self.primary_key.as_deref().unwrap_or(DEFAULT_PRIMARY_KEY)
    }

    pub fn hook(&self, hook: Hook) -> Option<&Callback> {
        self.hooks.get(&hook)
    }

    pub fn has_hook(&self, hook: Hook) -> bool {
        self.hooks.contains_key(&hook)
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    pub fn is_fillable(&self, field: &str) -> bool {
        self.fillable.contains(field)
    }
}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordType")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("primary_key", &self.primary_key)
            .field("fillable", &self.fillable)
            .field("hashed", &self.hashed)
            .field("relations", &self.relations.keys().collect::<Vec<_>>())
            .field("hooks", &self.hooks.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
