//! Field-level rule evaluation

use super::builder::{BuiltRules, Rule};
use super::spec::Messages;
use crate::error_tree::ErrorTree;
use crate::model::value::{is_blank, to_param};
use crate::model::Attributes;
use crate::store::{Repository, UniqueProbe};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Everything one evaluation sees
pub struct RuleInput<'a> {
    pub fields: &'a Attributes,
    pub rules: &'a BuiltRules,
    pub messages: &'a Messages,
    /// Backs storage-aware rules such as `unique`
    pub repository: &'a dyn Repository,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Verdict {
    pub passed: bool,
    pub errors: ErrorTree,
}

pub trait RuleEngine {
    fn evaluate(&self, input: &RuleInput<'_>) -> Verdict;
}

/// Rules that run even when the field is blank
const IMPLICIT: &[&str] = &["required", "accepted"];

/// Built-in evaluator for the common rule vocabulary
///
/// Unknown rule kinds are logged and pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicRuleEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Measure {
    Numeric,
    Characters,
    Items,
}

enum Outcome {
    Pass,
    Fail,
    Unknown,
}

impl RuleEngine for BasicRuleEngine {
    fn evaluate(&self, input: &RuleInput<'_>) -> Verdict {
        let mut errors = ErrorTree::new();

        for (field, rules) in input.rules {
            let value = input.fields.get(field);
            let has = |kind: &str| rules.iter().any(|r| r.kind == kind);

            if has("sometimes") && value.is_none() {
                continue;
            }
            let nullable = has("nullable");
            let numeric = has("numeric") || has("integer");

            for rule in rules {
                if is_blank(value) && !IMPLICIT.contains(&rule.kind.as_str()) {
                    continue;
                }
                if nullable && value.is_some_and(Value::is_null) {
                    continue;
                }
                let measure = measure(value, numeric);
                match check(rule, field, value, measure, input) {
                    Outcome::Pass => {}
                    Outcome::Fail => {
                        errors.add(field, render(rule, field, measure, input.messages));
                    }
                    Outcome::Unknown => {
                        tracing::warn!(rule = %rule.kind, field = %field, "unknown validation rule ignored");
                    }
                }
            }
        }

        Verdict {
            passed: errors.is_empty(),
            errors,
        }
    }
}

fn measure(value: Option<&Value>, numeric: bool) -> Measure {
    match value {
        Some(Value::Array(_)) => Measure::Items,
        Some(Value::Number(_)) => Measure::Numeric,
        _ if numeric => Measure::Numeric,
        _ => Measure::Characters,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn size_of(value: &Value, measure: Measure) -> Option<f64> {
    match (measure, value) {
        (Measure::Items, Value::Array(items)) => Some(items.len() as f64),
        (Measure::Numeric, v) => as_number(v),
        (_, v) => Some(to_param(v).chars().count() as f64),
    }
}

fn param_number(rule: &Rule, index: usize) -> Option<f64> {
    rule.param(index).and_then(|p| p.trim().parse().ok())
}

fn email_pattern() -> Option<&'static Regex> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok())
        .as_ref()
}

/// `/pattern/flags` or a bare pattern; commas were split off by the parser
fn user_pattern(rule: &Rule) -> Option<Regex> {
    let raw = rule.params.join(",");
    let compiled = match raw.strip_prefix('/').and_then(|r| r.rsplit_once('/')) {
        Some((body, flags)) if flags.contains('i') => Regex::new(&format!("(?i){}", body)),
        Some((body, _)) => Regex::new(body),
        None => Regex::new(&raw),
    };
    compiled
        .map_err(|e| tracing::warn!(pattern = %raw, error = %e, "invalid regex rule"))
        .ok()
}

fn is_date(value: &Value) -> bool {
    let Value::String(s) = value else {
        return false;
    };
    DateTime::parse_from_rfc3339(s).is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").is_ok()
        || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

fn pass_if(condition: bool) -> Outcome {
    if condition {
        Outcome::Pass
    } else {
        Outcome::Fail
    }
}

fn check(
    rule: &Rule,
    field: &str,
    value: Option<&Value>,
    measure: Measure,
    input: &RuleInput<'_>,
) -> Outcome {
    let v = value.unwrap_or(&Value::Null);
    let text = to_param(v);

    match rule.kind.as_str() {
        "required" => pass_if(!is_blank(value)),
        "accepted" => pass_if(matches!(text.as_str(), "yes" | "on" | "1" | "true")),
        "nullable" | "sometimes" => Outcome::Pass,
        "string" => pass_if(v.is_string()),
        "numeric" => pass_if(as_number(v).is_some()),
        "integer" => pass_if(v.is_i64() || v.is_u64() || text.trim().parse::<i64>().is_ok()),
        "boolean" => pass_if(v.is_boolean() || matches!(text.as_str(), "0" | "1")),
        "email" => pass_if(email_pattern().is_some_and(|re| re.is_match(&text))),
        "alpha" => pass_if(text.chars().all(char::is_alphabetic)),
        "alpha_num" => pass_if(text.chars().all(char::is_alphanumeric)),
        "alpha_dash" => pass_if(
            text.chars()
                .all(|c| c.is_alphanumeric() || c == '-' || c == '_'),
        ),
        "date" => pass_if(is_date(v)),
        "min" => compare(v, measure, rule, |size, p| size >= p[0]),
        "max" => compare(v, measure, rule, |size, p| size <= p[0]),
        "size" => compare(v, measure, rule, |size, p| (size - p[0]).abs() < f64::EPSILON),
        "between" => compare(v, measure, rule, |size, p| {
            p.len() > 1 && size >= p[0] && size <= p[1]
        }),
        "in" => pass_if(rule.params.iter().any(|p| *p == text)),
        "not_in" => pass_if(!rule.params.iter().any(|p| *p == text)),
        "same" => pass_if(rule.param(0).and_then(|o| input.fields.get(o)) == Some(v)),
        "different" => pass_if(rule.param(0).and_then(|o| input.fields.get(o)) != Some(v)),
        "confirmed" => {
            pass_if(input.fields.get(&format!("{}_confirmation", field)) == Some(v))
        }
        "regex" => pass_if(user_pattern(rule).is_some_and(|re| re.is_match(&text))),
        "unique" => {
            let probe = UniqueProbe::from_rule(rule, v);
            match input.repository.is_taken(&probe) {
                Ok(taken) => pass_if(!taken),
                Err(e) => {
                    tracing::warn!(table = probe.table, error = %e, "uniqueness probe failed");
                    Outcome::Fail
                }
            }
        }
        _ => Outcome::Unknown,
    }
}

fn compare<F>(value: &Value, measure: Measure, rule: &Rule, test: F) -> Outcome
where
    F: Fn(f64, &[f64]) -> bool,
{
    let params: Vec<f64> = (0..rule.params.len())
        .map_while(|i| param_number(rule, i))
        .collect();
    match size_of(value, measure) {
        Some(size) if !params.is_empty() => pass_if(test(size, &params)),
        _ => Outcome::Fail,
    }
}

fn template(kind: &str, measure: Measure) -> &'static str {
    let unit = |numeric: &'static str, chars: &'static str, items: &'static str| match measure {
        Measure::Numeric => numeric,
        Measure::Characters => chars,
        Measure::Items => items,
    };
    match kind {
        "required" => "The :attribute field is required.",
        "accepted" => "The :attribute must be accepted.",
        "string" => "The :attribute must be a string.",
        "numeric" => "The :attribute must be a number.",
        "integer" => "The :attribute must be an integer.",
        "boolean" => "The :attribute field must be true or false.",
        "email" => "The :attribute must be a valid email address.",
        "alpha" => "The :attribute may only contain letters.",
        "alpha_num" => "The :attribute may only contain letters and numbers.",
        "alpha_dash" => "The :attribute may only contain letters, numbers and dashes.",
        "date" => "The :attribute is not a valid date.",
        "min" => unit(
            "The :attribute must be at least :min.",
            "The :attribute must be at least :min characters.",
            "The :attribute must have at least :min items.",
        ),
        "max" => unit(
            "The :attribute may not be greater than :max.",
            "The :attribute may not be greater than :max characters.",
            "The :attribute may not have more than :max items.",
        ),
        "size" => unit(
            "The :attribute must be :size.",
            "The :attribute must be :size characters.",
            "The :attribute must contain :size items.",
        ),
        "between" => unit(
            "The :attribute must be between :min and :max.",
            "The :attribute must be between :min and :max characters.",
            "The :attribute must have between :min and :max items.",
        ),
        "in" | "not_in" => "The selected :attribute is invalid.",
        "same" => "The :attribute and :other must match.",
        "different" => "The :attribute and :other must be different.",
        "confirmed" => "The :attribute confirmation does not match.",
        "regex" => "The :attribute format is invalid.",
        "unique" => "The :attribute has already been taken.",
        _ => "The :attribute is invalid.",
    }
}

/// Custom `field.rule`, then `rule`, then the built-in template
fn render(rule: &Rule, field: &str, measure: Measure, messages: &Messages) -> String {
    let text = messages
        .get(&format!("{}.{}", field, rule.kind))
        .or_else(|| messages.get(&rule.kind))
        .unwrap_or_else(|| template(&rule.kind, measure));

    let first = rule.param(0).unwrap_or_default();
    let (min, max) = match rule.kind.as_str() {
        "between" => (first, rule.param(1).unwrap_or_default()),
        _ => (first, first),
    };

    text.replace(":attribute", &field.replace('_', " "))
        .replace(":values", &rule.params.join(", "))
        .replace(":other", &first.replace('_', " "))
        .replace(":size", first)
        .replace(":min", min)
        .replace(":max", max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::build;
    use crate::rules::spec::RuleSpec;
    use crate::model::{Record, RecordType};
    use crate::store::MemoryRepository;
    use serde_json::json;
    use std::sync::Arc;

    fn evaluate(fields: Value, spec: RuleSpec, messages: Messages) -> Verdict {
        let record_type = Arc::new(RecordType::new("User", "users"));
        let mut record = Record::new(record_type);
        for (k, v) in fields.as_object().unwrap() {
            record.set(k.clone(), v.clone());
        }
        let rules = build(&spec, &record);
        let repo = MemoryRepository::new();
        BasicRuleEngine.evaluate(&RuleInput {
            fields: record.attributes(),
            rules: &rules,
            messages: &messages,
            repository: &repo,
        })
    }

    fn first(verdict: &Verdict, field: &str) -> String {
        verdict
            .errors
            .flatten(Some(field))
            .and_then(|f| f.as_leaf().map(str::to_string))
            .unwrap_or_default()
    }

    #[test]
    fn test_required_fails_on_blank() {
        let v = evaluate(json!({"name": "  "}), RuleSpec::new().field("name", "required"), Messages::new());
        assert!(!v.passed);
        assert_eq!(first(&v, "name"), "The name field is required.");
    }

    #[test]
    fn test_optional_rules_skip_missing_fields() {
        let v = evaluate(json!({}), RuleSpec::new().field("email", "email|max:5"), Messages::new());
        assert!(v.passed);
    }

    #[test]
    fn test_string_length_vs_numeric_size() {
        let v = evaluate(
            json!({"code": "abcdef", "age": 20}),
            RuleSpec::new().field("code", "max:5").field("age", "numeric|max:18"),
            Messages::new(),
        );
        assert_eq!(first(&v, "code"), "The code may not be greater than 5 characters.");
        assert_eq!(first(&v, "age"), "The age may not be greater than 18.");
    }

    #[test]
    fn test_between_message_substitutes_both_bounds() {
        let v = evaluate(json!({"rating": 9}), RuleSpec::new().field("rating", "between:1,5"), Messages::new());
        assert_eq!(first(&v, "rating"), "The rating must be between 1 and 5.");
    }

    #[test]
    fn test_custom_message_precedence() {
        let messages = Messages::new()
            .with("required", "generic")
            .with("name.required", "specific :attribute");
        let v = evaluate(
            json!({}),
            RuleSpec::new().field("name", "required").field("last_name", "required"),
            messages,
        );
        assert_eq!(first(&v, "name"), "specific name");
        assert_eq!(first(&v, "last_name"), "generic");
    }

    #[test]
    fn test_email_in_and_confirmed() {
        let v = evaluate(
            json!({
                "email": "not-an-email",
                "role": "root",
                "password": "a",
                "password_confirmation": "b"
            }),
            RuleSpec::new()
                .field("email", "email")
                .field("role", "in:admin,editor")
                .field("password", "confirmed"),
            Messages::new(),
        );
        assert_eq!(v.errors.count(), 3);
    }

    #[test]
    fn test_regex_with_delimiters_and_commas() {
        let v = evaluate(
            json!({"zip": "123"}),
            RuleSpec::new().field_rules("zip", ["regex:/^[0-9]{3,5}$/"]),
            Messages::new(),
        );
        assert!(v.passed);
    }

    #[test]
    fn test_unknown_rule_passes() {
        let v = evaluate(json!({"x": "y"}), RuleSpec::new().field("x", "shiny"), Messages::new());
        assert!(v.passed);
    }

    #[test]
    fn test_nullable_skips_null() {
        let v = evaluate(json!({"bio": null}), RuleSpec::new().field("bio", "nullable|string"), Messages::new());
        assert!(v.passed);
    }
}
