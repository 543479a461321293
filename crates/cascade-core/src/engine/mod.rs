//! Validation and Persistence Engines
//!
//! [`Engine`] owns the collaborators and drives every operation on a record
//! graph. Operations keep a boolean contract: `true` on success, `false`
//! with the reason on [`Record::failure`] and field messages on
//! [`Record::errors`].
//!
//! ## Logging Ownership
//!
//! Each public operation logs one start and one end (or end_error) event
//! with `record_type`, `table` and the request id when one is set. Related
//! records handled inside a cascade are not bracketed separately.

mod events;
mod persistence;
mod request;
mod validation;

pub use persistence::SAVE_FAILED_MESSAGE;
pub use validation::VETOED_MESSAGE;
pub use request::Request;

use crate::collab::{Argon2Hasher, Hasher, InputSource};
use crate::config::EngineConfig;
use crate::errors::{CascadeError, ExError, Result};
use crate::model::{Callback, HookOutcome, ModelEvent, Payload, Record, Registry};
use crate::rules::{BasicRuleEngine, MapCatalog, MessageCatalog, RuleEngine};
use crate::store::{Repository, StoreResult};
use crate::{log_op_end, log_op_error, log_op_start};
use cascade_core_types::RequestContext;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// Engine over a repository `R`
///
/// Not `Sync`: one caller drives a cascade to completion before the next.
pub struct Engine<R> {
    config: EngineConfig,
    registry: Registry,
    repository: R,
    rule_engine: Box<dyn RuleEngine>,
    catalog: Box<dyn MessageCatalog>,
    hasher: Box<dyn Hasher>,
    input: Option<Box<dyn InputSource>>,
    listeners: BTreeMap<(String, ModelEvent), Vec<Callback>>,
    context: Option<RequestContext>,
}

impl<R: Repository> Engine<R> {
    /// Engine with the built-in rule engine, an empty catalog and argon2 hashing
    pub fn new(registry: Registry, repository: R) -> Self {
        Self {
            config: EngineConfig::default(),
            registry,
            repository,
            rule_engine: Box::new(BasicRuleEngine),
            catalog: Box::new(MapCatalog::new()),
            hasher: Box::new(Argon2Hasher::new()),
            input: None,
            listeners: BTreeMap::new(),
            context: None,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_rule_engine(mut self, rule_engine: impl RuleEngine + 'static) -> Self {
        self.rule_engine = Box::new(rule_engine);
        self
    }

    pub fn with_catalog(mut self, catalog: impl MessageCatalog + 'static) -> Self {
        self.catalog = Box::new(catalog);
        self
    }

    pub fn with_hasher(mut self, hasher: impl Hasher + 'static) -> Self {
        self.hasher = Box::new(hasher);
        self
    }

    pub fn with_input(mut self, input: impl InputSource + 'static) -> Self {
        self.input = Some(Box::new(input));
        self
    }

    /// Correlation ids attached to every operation log line
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Run `callback` on `event` for every record of `type_name`
    ///
    /// A `Stop` from a listener on a vetoable event aborts the operation.
    pub fn listen<F>(&mut self, type_name: impl Into<String>, event: ModelEvent, callback: F)
    where
        F: Fn(&mut Record) -> HookOutcome + Send + Sync + 'static,
    {
        self.listeners
            .entry((type_name.into(), event))
            .or_default()
            .push(Arc::new(callback));
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn repository_mut(&mut self) -> &mut R {
        &mut self.repository
    }

    /// A new, unsaved record of `type_name`
    ///
    /// # Errors
    ///
    /// Returns `UnknownRecordType` if no such type is registered.
    pub fn make(&self, type_name: &str) -> Result<Record> {
        self.registry
            .make(type_name)
            .ok_or_else(|| CascadeError::UnknownRecordType {
                type_name: type_name.to_string(),
            })
    }

    /// Stored record of `type_name` with primary key `key`, skipping soft-deleted rows
    ///
    /// # Errors
    ///
    /// Returns `UnknownRecordType` for an unregistered type, or the
    /// repository's error.
    pub fn find(&self, type_name: &str, key: &Value) -> StoreResult<Option<Record>> {
        self.lookup(type_name, key, false)
    }

    /// Like [`Engine::find`], soft-deleted rows included
    ///
    /// # Errors
    ///
    /// Same as [`Engine::find`].
    pub fn find_with_trashed(&self, type_name: &str, key: &Value) -> StoreResult<Option<Record>> {
        self.lookup(type_name, key, true)
    }

    fn lookup(&self, type_name: &str, key: &Value, with_trashed: bool) -> StoreResult<Option<Record>> {
        let record_type = self.registry.get(type_name).ok_or_else(|| {
            ExError::from(CascadeError::UnknownRecordType {
                type_name: type_name.to_string(),
            })
            .with_op("find")
        })?;
        self.repository.find(record_type, key, with_trashed)
    }

    /// Payload of the call, or the input source's fields when none was given
    fn resolve_data(&self, request: &Request) -> Payload {
        match (&request.data, &self.input) {
            (Some(data), _) => data.clone(),
            (None, Some(input)) => input.all_fields(),
            (None, None) => Payload::new(),
        }
    }

    fn request_id(&self) -> Option<&str> {
        self.context.as_ref().map(|c| c.request_id.as_str())
    }

    fn begin(&self, op: &'static str, record: &Record) -> Instant {
        log_op_start!(
            op,
            record_type = record.type_name(),
            table = record.table(),
            request_id = self.request_id()
        );
        Instant::now()
    }

    /// Close an operation: log its end and settle `record.failure`
    fn finish(
        &self,
        op: &'static str,
        record: &mut Record,
        start: Instant,
        outcome: Result<()>,
    ) -> bool {
        let duration_ms = start.elapsed().as_millis() as u64;
        match outcome {
            Ok(()) => {
                log_op_end!(
                    op,
                    duration_ms = duration_ms,
                    record_type = record.type_name(),
                    table = record.table(),
                    request_id = self.request_id()
                );
                record.set_failure(None);
                true
            }
            Err(err) => {
                log_op_error!(
                    op,
                    err.clone(),
                    duration_ms = duration_ms,
                    record_type = record.type_name(),
                    table = record.table(),
                    error_count = record.errors().count(),
                    request_id = self.request_id()
                );
                record.set_failure(Some(err));
                false
            }
        }
    }
}
