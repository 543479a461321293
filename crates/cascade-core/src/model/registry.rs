//! Registry of record types by name

use super::record::Record;
use super::record_type::RecordType;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct Registry {
    types: BTreeMap<String, Arc<RecordType>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `record_type`, replacing any type of the same name
    pub fn register(&mut self, record_type: RecordType) -> Arc<RecordType> {
        let record_type = Arc::new(record_type);
        self.types
            .insert(record_type.name.clone(), record_type.clone());
        record_type
    }

    pub fn get(&self, name: &str) -> Option<&Arc<RecordType>> {
        self.types.get(name)
    }

    /// A new, empty record of the named type
    pub fn make(&self, name: &str) -> Option<Record> {
        self.get(name).map(|t| Record::new(t.clone()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}
