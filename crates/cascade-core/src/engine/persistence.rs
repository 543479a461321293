//! Persistence Engine
//!
//! A cascade validates the whole tree first and writes nothing if any node
//! fails. Once writing starts it is best effort: related records that
//! validate are saved even when a sibling fails, and nothing is rolled
//! back.

use super::validation::{drop_non_scalar, failed_relations, related_vetoed, VETOED_MESSAGE};
use super::{Engine, Request};
use crate::diff::{Change, Diff};
use crate::error_tree::ErrorTree;
use crate::errors::{CascadeError, Result};
use crate::model::value::timestamp;
use crate::model::{
    Cardinality, Hook, ModelEvent, Payload, Record, Related, Relation, RelationKind,
};
use crate::path::PathKey;
use crate::relations::{classify, elements_of, slice_of, RelationshipDescriptor};
use crate::store::Repository;
use cascade_core_types::Sensitive;
use serde_json::Value;
use std::collections::BTreeMap;

/// Message recorded for a related record that validated but was not written
pub const SAVE_FAILED_MESSAGE: &str = "The related record could not be saved.";

impl<R: Repository> Engine<R> {
    /// Validate (unless already validated this pass), hash, write
    pub fn save(&mut self, record: &mut Record, request: &Request) -> bool {
        let start = self.begin("save", record);
        let outcome = self.save_impl(record, request, false);
        self.finish("save", record, start, outcome)
    }

    /// Save with field validation bypassed; hooks, hashing and the write still run
    pub fn force_save(&mut self, record: &mut Record, request: &Request) -> bool {
        let start = self.begin("force_save", record);
        let outcome = self.save_impl(record, request, true);
        self.finish("force_save", record, start, outcome)
    }

    /// Delete through the repository. Hooks and events cannot veto a delete.
    pub fn delete(&mut self, record: &mut Record) -> bool {
        let start = self.begin("delete", record);
        let outcome = self.delete_impl(record);
        self.finish("delete", record, start, outcome)
    }

    /// Validate the whole tree, then save the record and its related records
    pub fn save_recursive(&mut self, record: &mut Record, request: &Request) -> bool {
        let start = self.begin("save_recursive", record);
        let outcome = self.save_recursive_impl(record, request);
        self.finish("save_recursive", record, start, outcome)
    }

    /// Save the related records `relationships` found in `data`
    ///
    /// `record` must already be stored. Failed relations leave their errors
    /// under the relation name; saved siblings stay saved.
    pub fn save_relations(
        &mut self,
        record: &mut Record,
        request: &Request,
        relationships: &[RelationshipDescriptor],
        data: &Payload,
    ) -> bool {
        let start = self.begin("save_relations", record);
        let outcome = self.save_relations_impl(record, request, relationships, data);
        self.finish("save_relations", record, start, outcome)
    }

    /// Save, then delete whatever the save outcome. Returns the save result.
    pub fn save_and_delete(&mut self, record: &mut Record, request: &Request) -> bool {
        let saved = self.save(record, request);
        self.delete_after_save(record);
        saved
    }

    pub fn force_save_and_delete(&mut self, record: &mut Record, request: &Request) -> bool {
        let saved = self.force_save(record, request);
        self.delete_after_save(record);
        saved
    }

    /// Point `child` at `parent` through the named relation and force-save it
    ///
    /// Returns the saved child, or `None` if the relation is unknown or the
    /// write failed.
    pub fn save_relation(&mut self, parent: &Record, relation: &str, mut child: Record) -> Option<Record> {
        let start = self.begin("save_relation", &child);
        let outcome = match parent.record_type().relation(relation).cloned() {
            Some(declared) => {
                assign_owner_key(parent, &declared, &mut child);
                self.save_impl(&mut child, &Request::internal(), true)
            }
            None => Err(CascadeError::UnknownRelation {
                record_type: parent.type_name().to_string(),
                relation: relation.to_string(),
            }),
        };
        self.finish("save_relation", &mut child, start, outcome)
            .then_some(child)
    }

    pub(crate) fn save_impl(&mut self, record: &mut Record, request: &Request, bypass: bool) -> Result<()> {
        let exists = record.exists();

        self.guard(record, if exists { Hook::BeforeUpdate } else { Hook::BeforeCreate })?;
        self.guard(record, Hook::BeforeSave)?;

        if !record.is_validated() {
            self.validate_impl(record, request, bypass)?;
        }

        self.hash_fields(record)?;
        record.clear_pass_flags();

        self.perform_write(record, request, exists)?;

        self.call_hook(record, if exists { Hook::AfterUpdate } else { Hook::AfterCreate });
        self.call_hook(record, Hook::AfterSave);
        Ok(())
    }

    /// Events around the repository write, as storage sees them
    fn perform_write(&mut self, record: &mut Record, request: &Request, exists: bool) -> Result<()> {
        self.guard_event(record, ModelEvent::Saving, request.before.as_ref())?;
        self.guard_event(
            record,
            if exists { ModelEvent::Updating } else { ModelEvent::Creating },
            None,
        )?;

        if record.record_type().timestamps {
            let now = timestamp(None);
            if !exists {
                record.set("created_at", now.clone());
            }
            record.set("updated_at", now);
        }

        drop_non_scalar(record);
        match self.repository.write(record) {
            Ok(true) => {}
            Ok(false) => return Err(write_failed(record, "write", "storage declined the write")),
            Err(err) => return Err(write_failed(record, "write", err.message())),
        }
        record.mark_persisted();

        self.fire(
            record,
            if exists { ModelEvent::Updated } else { ModelEvent::Created },
            None,
        );
        self.fire(record, ModelEvent::Saved, request.after.as_ref());
        Ok(())
    }

    /// Replace each hashed field that is set and changed since load
    fn hash_fields(&self, record: &mut Record) -> Result<()> {
        let record_type = record.record_type().clone();
        for field in &record_type.hashed {
            let Some(value) = record.get(field).filter(|v| !v.is_null()) else {
                continue;
            };
            if record.original_value(field) == Some(value) {
                continue;
            }
            let plaintext = Sensitive::new(match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });
            let hashed = self
                .hasher
                .hash(&plaintext)
                .map_err(|e| CascadeError::HashingFailed {
                    field: field.clone(),
                    reason: e.message().to_string(),
                })?;
            record.set(field.clone(), hashed);
        }
        Ok(())
    }

    fn delete_impl(&mut self, record: &mut Record) -> Result<()> {
        self.call_hook(record, Hook::BeforeDelete);
        self.fire(record, ModelEvent::Deleting, None);

        let result = self.repository.delete(record);
        if matches!(result, Ok(true)) && record.record_type().soft_delete_column.is_none() {
            record.mark_removed();
        }

        self.fire(record, ModelEvent::Deleted, None);
        self.call_hook(record, Hook::AfterDelete);

        match result {
            Ok(true) => Ok(()),
            Ok(false) => Err(write_failed(record, "delete", "no stored row to delete")),
            Err(err) => Err(write_failed(record, "delete", err.message())),
        }
    }

    /// Delete half of the save-and-delete pair; keeps the save's failure on the record
    fn delete_after_save(&mut self, record: &mut Record) {
        let failure = record.failure().cloned();
        if !self.delete(record) {
            tracing::debug!(record_type = record.type_name(), "delete after save failed");
        }
        record.set_failure(failure);
    }

    fn save_recursive_impl(&mut self, record: &mut Record, request: &Request) -> Result<()> {
        let data = self.resolve_data(request);
        let request = Request {
            data: Some(data.clone()),
            ..request.clone()
        };

        self.validate_recursive_impl(record, &request)?;
        self.save_impl(record, &request, false)?;

        let relationships = classify(record.record_type(), &data, &request.conditions);
        if relationships.is_empty() {
            return Ok(());
        }
        self.save_relations_impl(record, &request, &relationships, &data)
    }

    pub(crate) fn save_relations_impl(
        &mut self,
        record: &mut Record,
        request: &Request,
        relationships: &[RelationshipDescriptor],
        data: &Payload,
    ) -> Result<()> {
        for descriptor in relationships {
            let target = self.target_of(record.record_type(), descriptor)?;
            let relation = record
                .record_type()
                .relation(&descriptor.accessor)
                .cloned()
                .ok_or_else(|| CascadeError::UnknownRelation {
                    record_type: record.type_name().to_string(),
                    relation: descriptor.accessor.clone(),
                })?;
            let mut relation_errors = ErrorTree::new();
            let mut relation_diff: BTreeMap<PathKey, Diff> = BTreeMap::new();

            match descriptor.cardinality {
                Cardinality::One => {
                    let slice = slice_of(data, &descriptor.name);
                    let scoped = request.scoped(&descriptor.name, slice.clone());
                    let mut child = self.locate(&target, &slice);

                    match self.validate_impl(&mut child, &scoped, false) {
                        Ok(()) => match self.attach(record, &relation, &mut child) {
                            Ok(()) => {
                                if !child.diff().is_empty() {
                                    relation_diff.insert(PathKey::Index(0), child.diff().clone());
                                }
                                record.set_relation(descriptor.accessor.clone(), Related::One(Box::new(child)));
                            }
                            Err(err) => {
                                attach_failed(&descriptor.name, None, &err);
                                record
                                    .errors_mut()
                                    .add(descriptor.name.clone(), SAVE_FAILED_MESSAGE);
                            }
                        },
                        Err(CascadeError::HookVetoed { hook, .. }) => {
                            related_vetoed(&descriptor.name, None, &hook);
                            record.errors_mut().add(descriptor.name.clone(), VETOED_MESSAGE);
                        }
                        Err(_) => relation_errors.merge(child.errors().clone()),
                    }
                }
                Cardinality::Many => {
                    let mut validated = Vec::new();
                    for (index, slice) in elements_of(data, &descriptor.name) {
                        let scoped = request.scoped(&descriptor.name, slice.clone());
                        let mut child = self.locate(&target, &slice);
                        match self.validate_impl(&mut child, &scoped, false) {
                            Ok(()) => validated.push((index, slice, scoped, child)),
                            Err(CascadeError::HookVetoed { hook, .. }) => {
                                related_vetoed(&descriptor.name, Some(&index), &hook);
                                relation_errors.add(index, VETOED_MESSAGE);
                            }
                            Err(_) => relation_errors.add(index, child.errors().clone()),
                        }
                    }

                    let mut saved = Vec::new();
                    for (index, slice, scoped, mut child) in validated {
                        match self.attach(record, &relation, &mut child) {
                            Ok(()) => saved.push((index, slice, scoped, child)),
                            Err(err) => {
                                attach_failed(&descriptor.name, Some(&index), &err);
                                relation_errors.add(index, SAVE_FAILED_MESSAGE);
                            }
                        }
                    }

                    let mut children = Vec::with_capacity(saved.len());
                    for (index, slice, scoped, mut child) in saved {
                        let nested = classify(child.record_type(), &slice, &scoped.conditions);
                        if !nested.is_empty()
                            && self
                                .save_relations_impl(&mut child, &scoped, &nested, &slice)
                                .is_err()
                        {
                            relation_errors.add(index.clone(), child.errors().clone());
                        }
                        if !child.diff().is_empty() {
                            relation_diff.insert(index, child.diff().clone());
                        }
                        children.push(child);
                    }
                    if !children.is_empty() {
                        record.set_relation(descriptor.accessor.clone(), Related::Many(children));
                    }
                }
            }

            record.errors_mut().add(descriptor.name.clone(), relation_errors);
            if !relation_diff.is_empty() {
                record
                    .diff_mut()
                    .insert(descriptor.name.clone(), Change::Related(relation_diff));
            }
        }

        if record.errors().is_empty() {
            return Ok(());
        }
        Err(CascadeError::RelationshipValidationFailed {
            record_type: record.type_name().to_string(),
            relations: failed_relations(record),
        })
    }

    /// Store `child` and link it to `parent` the way the relation kind requires
    fn attach(&mut self, parent: &mut Record, relation: &Relation, child: &mut Record) -> Result<()> {
        let internal = Request::internal();
        match relation.kind {
            RelationKind::BelongsTo | RelationKind::MorphTo => {
                self.save_impl(child, &internal, true)?;
                let key = child
                    .key()
                    .cloned()
                    .ok_or_else(|| write_failed(child, "associate", "related record has no key"))?;
                parent.set(relation.foreign_key.clone(), key);
                if let Some(morph_type) = &relation.morph_type {
                    parent.set(morph_type.clone(), child.type_name());
                }

                let prior = parent.diff().clone();
                self.save_impl(parent, &internal, true)?;
                parent.diff_mut().absorb(prior);
                Ok(())
            }
            RelationKind::BelongsToMany => {
                self.save_impl(child, &internal, true)?;
                let Some(pivot) = &relation.pivot else {
                    return Err(write_failed(parent, "attach", "relation declares no pivot"));
                };
                let parent_key = parent.key().cloned().unwrap_or(Value::Null);
                let child_key = child.key().cloned().unwrap_or(Value::Null);
                match self.repository.attach(pivot, &parent_key, &child_key) {
                    Ok(true) => Ok(()),
                    Ok(false) => Err(CascadeError::PersistenceWriteFailed {
                        table: pivot.table.clone(),
                        operation: "attach".to_string(),
                        reason: "pivot row not written".to_string(),
                    }),
                    Err(err) => Err(CascadeError::PersistenceWriteFailed {
                        table: pivot.table.clone(),
                        operation: "attach".to_string(),
                        reason: err.message().to_string(),
                    }),
                }
            }
            RelationKind::HasOne
            | RelationKind::HasMany
            | RelationKind::HasManyThrough
            | RelationKind::MorphOne
            | RelationKind::MorphMany => {
                assign_owner_key(parent, relation, child);
                self.save_impl(child, &internal, true)
            }
            RelationKind::Other => Err(CascadeError::UnknownRelation {
                record_type: parent.type_name().to_string(),
                relation: relation.target.clone(),
            }),
        }
    }
}

/// `child[fk] = parent[owner key or primary key]`, plus the morph type
fn assign_owner_key(parent: &Record, relation: &Relation, child: &mut Record) {
    let owner_key = relation.owner_key.as_deref().unwrap_or(parent.key_name());
    let value = parent.get(owner_key).cloned().unwrap_or(Value::Null);
    child.set(relation.foreign_key.clone(), value);
    if let Some(morph_type) = &relation.morph_type {
        child.set(morph_type.clone(), parent.type_name());
    }
}

fn write_failed(record: &Record, operation: &str, reason: &str) -> CascadeError {
    CascadeError::PersistenceWriteFailed {
        table: record.table().to_string(),
        operation: operation.to_string(),
        reason: reason.to_string(),
    }
}

fn attach_failed(relation: &str, index: Option<&PathKey>, err: &CascadeError) {
    tracing::warn!(
        relation,
        index = ?index,
        error = %err,
        "related record validated but was not saved"
    );
}
