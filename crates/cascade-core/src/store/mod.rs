//! Storage seam
//!
//! The engines reach storage only through [`Repository`]. `cascade-store`
//! provides the SQLite implementation; [`MemoryRepository`] keeps rows in
//! process.

pub mod memory;

pub use memory::MemoryRepository;

use crate::errors::ExError;
use crate::model::value::to_param;
use crate::model::{Attributes, Pivot, Record, RecordType};
use crate::rules::Rule;
use serde_json::Value;
use std::sync::Arc;

/// Result type alias for repository calls
pub type StoreResult<T> = std::result::Result<T, ExError>;

pub trait Repository {
    /// Row with primary key `key`; soft-deleted rows only when `with_trashed`
    fn find(
        &self,
        record_type: &Arc<RecordType>,
        key: &Value,
        with_trashed: bool,
    ) -> StoreResult<Option<Record>>;

    /// Insert or update. A new record without a key gets one assigned.
    /// `Ok(false)` means storage declined the write.
    fn write(&mut self, record: &mut Record) -> StoreResult<bool>;

    /// Remove the row, or stamp the soft-delete column when the type has one
    fn delete(&mut self, record: &mut Record) -> StoreResult<bool>;

    /// Insert a many-to-many join row
    fn attach(&mut self, pivot: &Pivot, parent_key: &Value, related_key: &Value)
        -> StoreResult<bool>;

    /// Whether another row already holds the probed value
    fn is_taken(&self, probe: &UniqueProbe<'_>) -> StoreResult<bool>;
}

/// Uniqueness query described by a canonical `unique` rule
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueProbe<'a> {
    pub table: &'a str,
    pub column: &'a str,
    pub value: &'a Value,
    /// (value, column) of the row to ignore, normally the record itself
    pub except: Option<(&'a str, &'a str)>,
    /// Extra `column = value` conditions; `NULL`/`NOT_NULL` test for null,
    /// a leading `!` negates
    pub wheres: Vec<(&'a str, &'a str)>,
}

impl<'a> UniqueProbe<'a> {
    /// Read `unique:table,column,except,idColumn[,col,val...]`
    pub fn from_rule(rule: &'a Rule, value: &'a Value) -> Self {
        let except = rule
            .param(2)
            .filter(|v| !v.eq_ignore_ascii_case("NULL"))
            .map(|v| (v, rule.param(3).unwrap_or("id")));
        let wheres = rule
            .params
            .get(4..)
            .unwrap_or_default()
            .chunks(2)
            .map(|pair| {
                (
                    pair[0].as_str(),
                    pair.get(1).map(String::as_str).unwrap_or_default(),
                )
            })
            .collect();

        Self {
            table: rule.param(0).unwrap_or_default(),
            column: rule.param(1).unwrap_or_default(),
            value,
            except,
            wheres,
        }
    }

    /// Whether `row` conflicts with the probed value
    pub fn matches(&self, row: &Attributes) -> bool {
        let cell = |column: &str| row.get(column).filter(|v| !v.is_null());

        if cell(self.column).map(to_param) != Some(to_param(self.value)) {
            return false;
        }
        if let Some((except, id_column)) = self.except {
            if cell(id_column).map(to_param).as_deref() == Some(except) {
                return false;
            }
        }
        self.wheres.iter().all(|(column, expected)| match *expected {
            "NULL" => cell(column).is_none(),
            "NOT_NULL" => cell(column).is_some(),
            negated if negated.starts_with('!') => {
                cell(column).map(to_param).as_deref() != Some(&negated[1..])
            }
            expected => cell(column).map(to_param).as_deref() == Some(expected),
        })
    }
}

/// Whether `row` is soft-deleted under `record_type`'s schema
pub fn is_trashed(record_type: &RecordType, row: &Attributes) -> bool {
    record_type
        .soft_delete_column
        .as_deref()
        .and_then(|c| row.get(c))
        .is_some_and(|v| !v.is_null())
}
