//! Validation Engine

use super::{Engine, Request};
use crate::diff::compute_diff;
use crate::error_tree::ErrorTree;
use crate::errors::{CascadeError, Result};
use crate::model::{Cardinality, Hook, ModelEvent, Payload, Record, RecordType, ValidationState};
use crate::path::PathKey;
use crate::relations::{classify, elements_of, slice_of, RelationshipDescriptor};
use crate::rules::catalog::resolve_messages;
use crate::rules::{build, RuleInput, RuleSpec};
use crate::store::Repository;
use std::sync::Arc;

/// Message recorded for a related record whose validating hook or listener stopped it
pub const VETOED_MESSAGE: &str = "The related record was stopped before validation.";

impl<R: Repository> Engine<R> {
    /// Validate one record against the request's rules, or its declared ones
    ///
    /// Hydrates the record from the request data (or the input source) on
    /// the first pass, recomputes its diff and replaces its errors.
    pub fn validate(&self, record: &mut Record, request: &Request) -> bool {
        let start = self.begin("validate", record);
        let outcome = self.validate_impl(record, request, false);
        self.finish("validate", record, start, outcome)
    }

    /// Validate a record and every related record addressed by the payload
    ///
    /// Related failures are merged into this record's errors under the
    /// relation name, so the result is `false` whenever any node failed.
    pub fn validate_recursive(&self, record: &mut Record, request: &Request) -> bool {
        let start = self.begin("validate_recursive", record);
        let outcome = self.validate_recursive_impl(record, request);
        self.finish("validate_recursive", record, start, outcome)
    }

    /// `bypass` forces an empty rule set; hooks, hydration and diffing still run
    pub(crate) fn validate_impl(
        &self,
        record: &mut Record,
        request: &Request,
        bypass: bool,
    ) -> Result<()> {
        self.guard(record, Hook::BeforeValidate)?;
        self.guard_event(record, ModelEvent::Validating, None)?;
        record.set_state(ValidationState::Validating);

        let record_type = record.record_type().clone();
        let spec = if bypass {
            RuleSpec::new()
        } else if !request.rules.is_empty() {
            request.rules.clone()
        } else {
            record_type.rules.clone()
        };
        let rules = build(&spec, record);

        drop_non_scalar(record);

        let messages = if request.messages.is_empty() && !rules.is_empty() {
            let folder = record_type
                .language_folder
                .as_deref()
                .unwrap_or(&self.config.language_folder);
            resolve_messages(self.catalog.as_ref(), &record_type, folder, &rules)
        } else {
            request.messages.clone()
        };

        if record_type.fill_from_input && !record_type.fillable.is_empty() && !record.is_hydrated()
        {
            let data = self.resolve_data(request);
            record.fill(&data);
            record.mark_hydrated();
            drop_non_scalar(record);
        }

        record.set_diff(compute_diff(record));

        if rules.is_empty() {
            record.set_errors(ErrorTree::new());
            record.set_state(ValidationState::Valid);
            record.mark_validated();
            return Ok(());
        }

        let verdict = self.rule_engine.evaluate(&RuleInput {
            fields: record.attributes(),
            rules: &rules,
            messages: &messages,
            repository: &self.repository,
        });

        if verdict.passed {
            record.set_errors(ErrorTree::new());
            record.set_state(ValidationState::Valid);
            record.mark_validated();
        } else {
            record.set_errors(verdict.errors);
            record.set_state(ValidationState::Invalid);
            if let Some(input) = self.input.as_ref().filter(|i| i.has_session()) {
                input.flash(&self.resolve_data(request));
            }
        }

        self.guard(record, Hook::AfterValidate)?;
        self.fire(record, ModelEvent::Validated, None);

        if verdict.passed {
            Ok(())
        } else {
            Err(CascadeError::ValidationFailed {
                record_type: record.type_name().to_string(),
                error_count: record.errors().count(),
            })
        }
    }

    pub(crate) fn validate_recursive_impl(&self, record: &mut Record, request: &Request) -> Result<()> {
        let data = self.resolve_data(request);
        let request = Request {
            data: Some(data.clone()),
            ..request.clone()
        };

        let own = self.validate_impl(record, &request, false);
        if let Err(err @ CascadeError::HookVetoed { .. }) = own {
            return Err(err);
        }

        let relationships = classify(record.record_type(), &data, &request.conditions);
        if !relationships.is_empty() {
            self.validate_relations(record, &request, &relationships, &data)?;
        }
        settle(record, own)
    }

    /// Validate each addressed relation, merging failures into `record`
    pub(crate) fn validate_relations(
        &self,
        record: &mut Record,
        request: &Request,
        relationships: &[RelationshipDescriptor],
        data: &Payload,
    ) -> Result<()> {
        for descriptor in relationships {
            let target = self.target_of(record.record_type(), descriptor)?;
            let mut relation_errors = ErrorTree::new();

            match descriptor.cardinality {
                Cardinality::One => {
                    let slice = slice_of(data, &descriptor.name);
                    let scoped = request.scoped(&descriptor.name, slice.clone());
                    let mut child = self.locate(&target, &slice);
                    match self.validate_impl(&mut child, &scoped, false) {
                        Ok(()) => {}
                        Err(CascadeError::HookVetoed { hook, .. }) => {
                            related_vetoed(&descriptor.name, None, &hook);
                            record.errors_mut().add(descriptor.name.clone(), VETOED_MESSAGE);
                        }
                        Err(_) => relation_errors.merge(child.errors().clone()),
                    }
                }
                Cardinality::Many => {
                    for (index, slice) in elements_of(data, &descriptor.name) {
                        let scoped = request.scoped(&descriptor.name, slice.clone());
                        let mut child = self.locate(&target, &slice);
                        match self.validate_impl(&mut child, &scoped, false) {
                            Ok(()) => {}
                            Err(CascadeError::HookVetoed { hook, .. }) => {
                                related_vetoed(&descriptor.name, Some(&index), &hook);
                                relation_errors.add(index, VETOED_MESSAGE);
                                continue;
                            }
                            Err(err) => {
                                tracing::debug!(relation = %descriptor.name, %index, error = %err, "related record invalid");
                            }
                        }

                        let nested = classify(child.record_type(), &slice, &scoped.conditions);
                        if !nested.is_empty() {
                            self.validate_relations(&mut child, &scoped, &nested, &slice)?;
                        }
                        if !child.errors().is_empty() {
                            relation_errors.add(index, child.errors().clone());
                        }
                    }
                }
            }

            record.errors_mut().add(descriptor.name.clone(), relation_errors);
        }
        Ok(())
    }

    /// Record type a relation points at
    pub(crate) fn target_of(
        &self,
        owner: &RecordType,
        descriptor: &RelationshipDescriptor,
    ) -> Result<Arc<RecordType>> {
        let relation = owner
            .relation(&descriptor.accessor)
            .ok_or_else(|| CascadeError::UnknownRelation {
                record_type: owner.name.clone(),
                relation: descriptor.accessor.clone(),
            })?;
        self.registry
            .get(&relation.target)
            .cloned()
            .ok_or_else(|| CascadeError::UnknownRecordType {
                type_name: relation.target.clone(),
            })
    }

    /// Stored record named by the slice's primary key, soft-deleted rows
    /// included, or a new one
    pub(crate) fn locate(&self, target: &Arc<RecordType>, slice: &Payload) -> Record {
        let Some(key) = slice.get(target.key_name()).filter(|k| !k.is_null()) else {
            return Record::new(target.clone());
        };
        match self.repository.find(target, key, true) {
            Ok(Some(record)) => record,
            Ok(None) => Record::new(target.clone()),
            Err(err) => {
                tracing::warn!(
                    record_type = %target.name,
                    err_code = err.code(),
                    err_message = err.message(),
                    "lookup of related record failed, starting a new one"
                );
                Record::new(target.clone())
            }
        }
    }
}

pub(crate) fn related_vetoed(relation: &str, index: Option<&PathKey>, hook: &str) {
    tracing::debug!(relation, index = ?index, hook, "related record vetoed");
}

/// Remove array and object attributes; storage only takes scalars
pub(crate) fn drop_non_scalar(record: &mut Record) {
    let dropped = record.strip_non_scalar();
    if !dropped.is_empty() {
        tracing::debug!(
            record_type = record.type_name(),
            fields = ?dropped,
            "dropped non-scalar attributes"
        );
    }
}

/// Overall result of a recursive pass: clean only if no node left errors
pub(crate) fn settle(record: &Record, own: Result<()>) -> Result<()> {
    if record.errors().is_empty() {
        return Ok(());
    }
    match own {
        Err(err) => Err(match err {
            CascadeError::ValidationFailed { record_type, .. } => CascadeError::ValidationFailed {
                record_type,
                error_count: record.errors().count(),
            },
            other => other,
        }),
        Ok(()) => Err(CascadeError::RelationshipValidationFailed {
            record_type: record.type_name().to_string(),
            relations: failed_relations(record),
        }),
    }
}

/// Relation names holding nested errors
pub(crate) fn failed_relations(record: &Record) -> Vec<String> {
    let record_type = record.record_type();
    record
        .errors()
        .keys()
        .map(ToString::to_string)
        .filter(|key| {
            record_type.relation(key).is_some()
                || record_type
                    .relation(&crate::relations::accessor_name(key))
                    .is_some()
        })
        .collect()
}
