//! Per-call arguments of the engine operations

use crate::model::{Callback, HookOutcome, Payload, Record};
use crate::relations::Conditions;
use crate::rules::{Messages, RuleSpec};
use std::fmt;
use std::sync::Arc;

/// Arguments shared by validate, save and their recursive forms
///
/// Empty `rules` means the record type's declared rules. Empty `messages`
/// means messages come from the catalog. `data: None` means the engine's
/// input source, if one is configured.
///
/// ```
/// use cascade_core::engine::Request;
/// use cascade_core::rules::RuleSpec;
///
/// let request = Request::new()
///     .with_rules(RuleSpec::new().field("title", "required"))
///     .with_json(serde_json::json!({"title": "Hello"}));
/// assert!(request.data.is_some());
/// ```
#[derive(Clone, Default)]
pub struct Request {
    pub conditions: Conditions,
    pub rules: RuleSpec,
    pub messages: Messages,
    pub data: Option<Payload>,
    /// One-shot callback run with the `saving` event
    pub before: Option<Callback>,
    /// One-shot callback run with the `saved` event
    pub after: Option<Callback>,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn with_rules(mut self, rules: RuleSpec) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_messages(mut self, messages: Messages) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_data(mut self, data: Payload) -> Self {
        self.data = Some(data);
        self
    }

    /// Data from a JSON object; any other JSON value gives an empty payload
    pub fn with_json(self, data: serde_json::Value) -> Self {
        self.with_data(match data {
            serde_json::Value::Object(map) => map,
            _ => Payload::new(),
        })
    }

    pub fn before<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut Record) -> HookOutcome + Send + Sync + 'static,
    {
        self.before = Some(Arc::new(callback));
        self
    }

    pub fn after<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut Record) -> HookOutcome + Send + Sync + 'static,
    {
        self.after = Some(Arc::new(callback));
        self
    }

    /// Arguments for a related record: relation-scoped conditions, rules and
    /// messages over that record's slice of the payload. Callbacks stay behind.
    pub(crate) fn scoped(&self, relation: &str, data: Payload) -> Request {
        Request {
            conditions: self.conditions.scoped(relation),
            rules: self.rules.scoped(relation),
            messages: self.messages.scoped(relation),
            data: Some(data),
            before: None,
            after: None,
        }
    }

    /// Arguments for the engine's own force-saves: nothing to hydrate from
    pub(crate) fn internal() -> Request {
        Request::new().with_data(Payload::new())
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("conditions", &self.conditions)
            .field("rules", &self.rules)
            .field("messages", &self.messages)
            .field("data", &self.data)
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .finish()
    }
}
