//! Message catalog lookup for rule failure texts

use super::builder::BuiltRules;
use super::spec::Messages;
use crate::errors::{CascadeError, Result};
use crate::model::RecordType;
use std::collections::BTreeMap;
use std::path::Path;

/// Localized message source
pub trait MessageCatalog {
    fn lookup(&self, key: &str) -> Option<String>;
}

/// Catalog held in memory, keyed by full dotted path
///
/// TOML tables flatten with `.`, so
///
/// ```toml
/// ["validation/App/Post"]
/// title.required = "A post needs a title"
/// ```
///
/// yields the key `validation/App/Post.title.required`.
#[derive(Debug, Clone, Default)]
pub struct MapCatalog {
    entries: BTreeMap<String, String>,
}

impl MapCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(key, text);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, text: impl Into<String>) {
        self.entries.insert(key.into(), text.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(source)?;
        let mut catalog = Self::new();
        flatten_into(&mut catalog.entries, None, &table)?;
        Ok(catalog)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| CascadeError::Configuration {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&source)
    }
}

fn flatten_into(
    out: &mut BTreeMap<String, String>,
    prefix: Option<&str>,
    table: &toml::Table,
) -> Result<()> {
    for (key, value) in table {
        let path = match prefix {
            Some(p) => format!("{}.{}", p, key),
            None => key.clone(),
        };
        match value {
            toml::Value::String(text) => {
                out.insert(path, text.clone());
            }
            toml::Value::Table(nested) => flatten_into(out, Some(&path), nested)?,
            other => {
                return Err(CascadeError::Configuration {
                    message: format!(
                        "catalog entry {} must be a string, found {}",
                        path,
                        other.type_str()
                    ),
                })
            }
        }
    }
    Ok(())
}

impl MessageCatalog for MapCatalog {
    fn lookup(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }
}

/// Messages for every (field, rule) pair of `rules` found in `catalog`
///
/// The catalog file for a type is `<folder>/<type name with \ as />.`,
/// tried as is, lower-cased, with `_` as `/`, then both. The first hit per
/// pair wins and is stored under `field.rule`.
pub fn resolve_messages(
    catalog: &dyn MessageCatalog,
    record_type: &RecordType,
    folder: &str,
    rules: &BuiltRules,
) -> Messages {
    let file = format!("{}/{}.", folder, record_type.name.replace('\\', "/"));
    let slashed = file.replace('_', "/");
    let files = [
        file.clone(),
        file.to_lowercase(),
        slashed.clone(),
        slashed.to_lowercase(),
    ];

    let mut messages = Messages::new();
    for (field, field_rules) in rules {
        for rule in field_rules {
            let key = format!("{}.{}", field, rule.kind);
            let suffix = match &record_type.language_key {
                Some(lang) => format!("{}.{}", lang, key),
                None => key.clone(),
            };
            if let Some(text) = files
                .iter()
                .find_map(|f| catalog.lookup(&format!("{}{}", f, suffix)))
            {
                messages.insert(key, text);
            }
        }
    }
    messages
}
