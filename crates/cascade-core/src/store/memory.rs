use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use serde_json::Value;

use super::{is_trashed, Repository, StoreResult, UniqueProbe};
use crate::errors::{ExError, ExErrorKind};
use crate::model::value::{key_string, timestamp};
use crate::model::{Attributes, Pivot, Record, RecordType};

/// In-memory repository
///
/// Rows are kept per table, keyed by the string form of their primary key.
/// Not thread-safe; one engine owns it.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    tables: HashMap<String, BTreeMap<String, Attributes>>,
    /// Highest integer key seen per table
    sequences: HashMap<String, i64>,
    /// (pivot table, parent key, related key)
    pivots: BTreeSet<(String, String, String)>,
    rejected: HashSet<String>,
    writes: usize,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a row directly, bypassing the engine. Returns its key.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the row has no usable value under `key_name`.
    pub fn insert_row(
        &mut self,
        table: &str,
        key_name: &str,
        row: Attributes,
    ) -> StoreResult<String> {
        let key = row
            .get(key_name)
            .and_then(key_string)
            .ok_or_else(|| {
                ExError::new(ExErrorKind::InvalidInput)
                    .with_op("insert_row")
                    .with_message(format!("row for {} has no {}", table, key_name))
            })?;
        self.bump_sequence(table, &key);
        self.tables
            .entry(table.to_string())
            .or_default()
            .insert(key.clone(), row);
        Ok(key)
    }

    pub fn row(&self, table: &str, key: &str) -> Option<&Attributes> {
        self.tables.get(table).and_then(|rows| rows.get(key))
    }

    /// All rows of `table` in key order, soft-deleted ones included
    pub fn rows(&self, table: &str) -> Vec<&Attributes> {
        self.tables
            .get(table)
            .map(|rows| rows.values().collect())
            .unwrap_or_default()
    }

    pub fn count(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, BTreeMap::len)
    }

    /// (parent key, related key) pairs stored in `pivot_table`
    pub fn pivot_rows(&self, pivot_table: &str) -> Vec<(String, String)> {
        self.pivots
            .iter()
            .filter(|(t, _, _)| t == pivot_table)
            .map(|(_, parent, related)| (parent.clone(), related.clone()))
            .collect()
    }

    /// Number of `write` calls so far, declined ones included
    pub fn write_count(&self) -> usize {
        self.writes
    }

    /// Decline every future write to `table`
    pub fn reject_writes(&mut self, table: impl Into<String>) {
        self.rejected.insert(table.into());
    }

    pub fn accept_writes(&mut self, table: &str) {
        self.rejected.remove(table);
    }

    fn bump_sequence(&mut self, table: &str, key: &str) {
        if let Ok(n) = key.parse::<i64>() {
            let seq = self.sequences.entry(table.to_string()).or_insert(0);
            *seq = (*seq).max(n);
        }
    }

    fn next_key(&mut self, table: &str) -> i64 {
        let seq = self.sequences.entry(table.to_string()).or_insert(0);
        *seq += 1;
        *seq
    }
}

impl Repository for MemoryRepository {
    fn find(
        &self,
        record_type: &Arc<RecordType>,
        key: &Value,
        with_trashed: bool,
    ) -> StoreResult<Option<Record>> {
        let Some(key) = key_string(key) else {
            return Ok(None);
        };
        Ok(self
            .row(&record_type.table, &key)
            .filter(|row| with_trashed || !is_trashed(record_type, row))
            .map(|row| Record::from_storage(record_type.clone(), row.clone())))
    }

    fn write(&mut self, record: &mut Record) -> StoreResult<bool> {
        self.writes += 1;
        let table = record.table().to_string();
        if self.rejected.contains(&table) {
            return Ok(false);
        }

        let key = match record.key().and_then(key_string) {
            Some(key) => key,
            None => {
                let next = self.next_key(&table);
                let key_name = record.key_name().to_string();
                record.set(key_name, next);
                next.to_string()
            }
        };
        self.bump_sequence(&table, &key);
        self.tables
            .entry(table)
            .or_default()
            .insert(key, record.attributes().clone());
        Ok(true)
    }

    fn delete(&mut self, record: &mut Record) -> StoreResult<bool> {
        let Some(key) = record.key().and_then(key_string) else {
            return Ok(false);
        };
        let table = record.table().to_string();
        let Some(rows) = self.tables.get_mut(&table) else {
            return Ok(false);
        };
        if !rows.contains_key(&key) {
            return Ok(false);
        }

        match record.record_type().soft_delete_column.clone() {
            Some(column) => {
                record.set(column, timestamp(None));
                rows.insert(key, record.attributes().clone());
            }
            None => {
                rows.remove(&key);
            }
        }
        Ok(true)
    }

    fn attach(
        &mut self,
        pivot: &Pivot,
        parent_key: &Value,
        related_key: &Value,
    ) -> StoreResult<bool> {
        match (key_string(parent_key), key_string(related_key)) {
            (Some(parent), Some(related)) => {
                self.pivots.insert((pivot.table.clone(), parent, related));
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn is_taken(&self, probe: &UniqueProbe<'_>) -> StoreResult<bool> {
        Ok(self
            .tables
            .get(probe.table)
            .is_some_and(|rows| rows.values().any(|row| probe.matches(row))))
    }
}
