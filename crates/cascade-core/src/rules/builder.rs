//! RuleSet Builder
//!
//! Turns a [`RuleSpec`] into concrete rules for one record: resolves `~`
//! placeholders against the record and gives every `unique` rule its
//! canonical `table,column,except,idColumn[,where...]` parameters.

use super::spec::RuleSpec;
use crate::model::value::{is_blank, to_param};
use crate::model::Record;
use std::collections::BTreeMap;
use std::fmt;

/// Field name to its expanded rules
pub type BuiltRules = BTreeMap<String, Vec<Rule>>;

/// One rule expression: `kind[:p1,p2,...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub kind: String,
    /// Always at least one slot; a bare rule has a single empty parameter
    pub params: Vec<String>,
}

impl Rule {
    pub fn parse(expr: &str) -> Self {
        let expr = expr.trim();
        match expr.split_once(':') {
            Some((kind, raw)) => Self {
                kind: kind.to_string(),
                params: raw.split(',').map(str::to_string).collect(),
            },
            None => Self {
                kind: expr.to_string(),
                params: vec![String::new()],
            },
        }
    }

    /// Parameter `index`, treating an empty slot as absent
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params
            .get(index)
            .map(String::as_str)
            .filter(|p| !p.is_empty())
    }

    pub fn has_params(&self) -> bool {
        self.params.iter().any(|p| !p.is_empty())
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind)?;
        if self.has_params() {
            write!(f, ":{}", self.params.join(","))?;
        }
        Ok(())
    }
}

/// Expand `spec` against the current state of `record`
///
/// Deterministic, and reads nothing but the record's schema and attributes.
pub fn build(spec: &RuleSpec, record: &Record) -> BuiltRules {
    spec.fields()
        .map(|(field, exprs)| {
            let rules = exprs
                .iter()
                .map(|expr| expand(Rule::parse(expr), field, record))
                .collect();
            (field.to_string(), rules)
        })
        .collect()
}

fn expand(mut rule: Rule, field: &str, record: &Record) -> Rule {
    for param in rule.params.iter_mut() {
        if let Some(name) = param.strip_prefix('~') {
            *param = resolve_placeholder(name, field, record);
        }
    }
    if rule.kind == "unique" {
        rule.params = unique_params(&rule, field, record);
    }
    rule
}

/// `~table` and `~field` name the record's table and the current field,
/// unless the record has a non-blank attribute of that name; any other
/// `~name` is the value of attribute `name`.
fn resolve_placeholder(name: &str, field: &str, record: &Record) -> String {
    let literal = record.get(name);
    match name {
        "table" if is_blank(literal) => record.table().to_string(),
        "field" if is_blank(literal) => field.to_string(),
        _ => literal.map(to_param).unwrap_or_default(),
    }
}

fn unique_params(rule: &Rule, field: &str, record: &Record) -> Vec<String> {
    let given = |i: usize| rule.param(i).map(str::to_string);
    let record_type = record.record_type();

    let (except, id_column) = match &record_type.primary_key {
        Some(pk) => (
            given(2).unwrap_or_else(|| record.get(pk).map(to_param).unwrap_or_default()),
            given(3).unwrap_or_else(|| pk.clone()),
        ),
        None => (
            given(2).unwrap_or_else(|| record.get("id").map(to_param).unwrap_or_default()),
            given(3).unwrap_or_else(|| "id".to_string()),
        ),
    };

    let mut params = vec![
        given(0).unwrap_or_else(|| record.table().to_string()),
        given(1).unwrap_or_else(|| field.to_string()),
        except,
        id_column,
    ];
    params.extend(rule.params.iter().skip(4).cloned());
    params
}
