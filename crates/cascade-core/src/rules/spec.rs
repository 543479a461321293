//! Caller-facing rule and message specifications
//!
//! Both mirror the shape of the payload they apply to: field entries at
//! the top, relation names mapping to nested specifications.
//!
//! ```
//! use cascade_core::rules::RuleSpec;
//!
//! let rules: RuleSpec = serde_json::from_value(serde_json::json!({
//!     "title": "required|max:120",
//!     "comments": { "body": ["required", "min:3"] }
//! })).unwrap();
//!
//! assert_eq!(rules.rules_for("title"), Some(&["required".to_string(), "max:120".to_string()][..]));
//! assert!(rules.scoped("comments").rules_for("body").is_some());
//! ```

use crate::relations::accessor_name;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "BTreeMap<String, RawRuleEntry>")]
pub struct RuleSpec {
    fields: BTreeMap<String, Vec<String>>,
    relations: BTreeMap<String, RuleSpec>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRuleEntry {
    Piped(String),
    List(Vec<String>),
    Nested(RuleSpec),
    Off(Option<bool>),
}

impl From<BTreeMap<String, RawRuleEntry>> for RuleSpec {
    fn from(raw: BTreeMap<String, RawRuleEntry>) -> Self {
        let mut spec = RuleSpec::new();
        for (name, entry) in raw {
            spec = match entry {
                RawRuleEntry::Piped(expr) => spec.field(name, &expr),
                RawRuleEntry::List(list) => spec.field_rules(name, list),
                RawRuleEntry::Nested(nested) => spec.relation(name, nested),
                RawRuleEntry::Off(_) => spec,
            };
        }
        spec
    }
}

impl RuleSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules for `name` as one pipe-delimited expression
    pub fn field(self, name: impl Into<String>, expr: &str) -> Self {
        self.field_rules(name, expr.split('|'))
    }

    /// Rules for `name` as a list; list items are never split on `|`
    pub fn field_rules<I, S>(mut self, name: impl Into<String>, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rules: Vec<String> = rules
            .into_iter()
            .map(Into::into)
            .filter(|r| !r.trim().is_empty())
            .collect();
        self.fields.insert(name.into(), rules);
        self
    }

    pub fn relation(mut self, name: impl Into<String>, spec: RuleSpec) -> Self {
        self.relations.insert(name.into(), spec);
        self
    }

    /// True when no field carries a rule; relation entries do not count
    pub fn is_empty(&self) -> bool {
        self.fields.values().all(Vec::is_empty)
    }

    pub fn rules_for(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    /// Fields with at least one rule
    pub fn fields(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields
            .iter()
            .filter(|(_, rules)| !rules.is_empty())
            .map(|(f, rules)| (f.as_str(), rules.as_slice()))
    }

    /// Rules scoped to a relation, looked up by raw then camelCase name
    pub fn scoped(&self, relation: &str) -> RuleSpec {
        self.relations
            .get(relation)
            .or_else(|| self.relations.get(&accessor_name(relation)))
            .cloned()
            .unwrap_or_default()
    }
}

/// Custom messages keyed `field.rule` (or bare `rule`)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "BTreeMap<String, RawMessageEntry>")]
pub struct Messages {
    texts: BTreeMap<String, String>,
    relations: BTreeMap<String, Messages>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMessageEntry {
    Text(String),
    Nested(Messages),
}

impl From<BTreeMap<String, RawMessageEntry>> for Messages {
    fn from(raw: BTreeMap<String, RawMessageEntry>) -> Self {
        let mut messages = Messages::new();
        for (key, entry) in raw {
            match entry {
                RawMessageEntry::Text(text) => {
                    messages.texts.insert(key, text);
                }
                RawMessageEntry::Nested(nested) => {
                    messages.relations.insert(key, nested);
                }
            }
        }
        messages
    }
}

impl Messages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(key, text);
        self
    }

    pub fn relation(mut self, name: impl Into<String>, messages: Messages) -> Self {
        self.relations.insert(name.into(), messages);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, text: impl Into<String>) {
        self.texts.insert(key.into(), text.into());
    }

    /// True when there are no top-level texts
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.texts.get(key).map(String::as_str)
    }

    pub fn texts(&self) -> &BTreeMap<String, String> {
        &self.texts
    }

    pub fn scoped(&self, relation: &str) -> Messages {
        self.relations
            .get(relation)
            .or_else(|| self.relations.get(&accessor_name(relation)))
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pipe_split_and_list_kept_verbatim() {
        let spec = RuleSpec::new()
            .field("title", "required|max:10")
            .field_rules("code", ["regex:/^(a|b)$/"]);

        assert_eq!(spec.rules_for("title").unwrap().len(), 2);
        assert_eq!(spec.rules_for("code").unwrap(), ["regex:/^(a|b)$/"]);
    }

    #[test]
    fn test_empty_entries_do_not_count() {
        let spec = RuleSpec::new().field("title", "").field_rules("body", Vec::<String>::new());
        assert!(spec.is_empty());
        assert_eq!(spec.fields().count(), 0);
    }

    #[test]
    fn test_relations_alone_leave_spec_empty() {
        let spec = RuleSpec::new().relation("comments", RuleSpec::new().field("body", "required"));
        assert!(spec.is_empty());
        assert!(!spec.scoped("comments").is_empty());
    }

    #[test]
    fn test_scoped_falls_back_to_camel_case() {
        let spec = RuleSpec::new().relation("userProfile", RuleSpec::new().field("bio", "max:5"));
        assert!(spec.scoped("user_profile").rules_for("bio").is_some());
        assert!(spec.scoped("missing").is_empty());
    }

    #[test]
    fn test_deserialize_mixed_shapes() {
        let spec: RuleSpec = serde_json::from_value(json!({
            "title": "required",
            "tags": ["array"],
            "draft": null,
            "comments": {"body": "required|min:3"}
        }))
        .unwrap();

        assert_eq!(spec.rules_for("title").unwrap(), ["required"]);
        assert_eq!(spec.rules_for("tags").unwrap(), ["array"]);
        assert!(spec.rules_for("draft").is_none());
        assert_eq!(spec.scoped("comments").rules_for("body").unwrap().len(), 2);
    }

    #[test]
    fn test_messages_deserialize_and_scope() {
        let messages: Messages = serde_json::from_value(json!({
            "title.required": "Give it a title",
            "comments": {"body.required": "Say something"}
        }))
        .unwrap();

        assert_eq!(messages.get("title.required"), Some("Give it a title"));
        assert_eq!(
            messages.scoped("comments").get("body.required"),
            Some("Say something")
        );
        assert!(messages.scoped("tags").is_empty());
    }
}
