//! SQLite repository implementation
//!
//! Every record type shares the `records` table: one row per
//! (table, key) holding the attribute map as JSON. Integer keys come from
//! `key_sequences`, many-to-many links live in `pivots`.

use crate::db;
use crate::errors::{corrupt_row, from_rusqlite, Result};
use crate::migrations::apply_migrations;
use cascade_core::model::value::{key_string, timestamp};
use cascade_core::model::{Attributes, Pivot, Record, RecordType};
use cascade_core::store::{is_trashed, Repository, StoreResult, UniqueProbe};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Open (or create) a database file and bring its schema up to date
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened or a migration fails.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = db::open(path)?;
        db::configure(&conn)?;
        Self::from_connection(conn)
    }

    /// # Errors
    ///
    /// Fails if a migration fails.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(db::open_in_memory()?)
    }

    /// Wrap an existing connection, applying pending migrations
    ///
    /// # Errors
    ///
    /// Fails if a migration fails.
    pub fn from_connection(mut conn: Connection) -> Result<Self> {
        apply_migrations(&mut conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Stored rows of `table`, soft-deleted ones included
    ///
    /// # Errors
    ///
    /// Fails on SQL errors.
    pub fn count(&self, table: &str) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM records WHERE table_name = ?1",
                [table],
                |row| row.get(0),
            )
            .map_err(from_rusqlite)?;
        Ok(count as usize)
    }

    /// Attribute map of one stored row
    ///
    /// # Errors
    ///
    /// Fails on SQL errors or an unreadable row.
    pub fn row(&self, table: &str, key: &str) -> Result<Option<Attributes>> {
        let text: Option<String> = self
            .conn
            .query_row(
                "SELECT attributes FROM records WHERE table_name = ?1 AND record_key = ?2",
                params![table, key],
                |row| row.get(0),
            )
            .optional()
            .map_err(from_rusqlite)?;
        text.map(|t| decode(table, key, &t)).transpose()
    }

    /// (parent key, related key) pairs stored in `pivot_table`, in key order
    ///
    /// # Errors
    ///
    /// Fails on SQL errors.
    pub fn pivot_rows(&self, pivot_table: &str) -> Result<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT parent_key, related_key FROM pivots
                 WHERE pivot_table = ?1 ORDER BY parent_key, related_key",
            )
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([pivot_table], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<(String, String)>, _>>()
            .map_err(from_rusqlite)?;
        Ok(rows)
    }

    /// Rows of `table` holding a non-null value in `column`
    fn rows_with(&self, table: &str, column: &str) -> Result<Vec<Attributes>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT record_key, attributes FROM records
                 WHERE table_name = ?1 AND json_extract(attributes, ?2) IS NOT NULL",
            )
            .map_err(from_rusqlite)?;
        let raw = stmt
            .query_map(params![table, json_path(column)], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        raw.iter()
            .map(|(key, text)| decode(table, key, text))
            .collect()
    }

    fn update_attributes(&self, table: &str, key: &str, attributes: &Attributes) -> Result<usize> {
        self.conn
            .execute(
                "UPDATE records SET attributes = ?3, written_at = ?4
                 WHERE table_name = ?1 AND record_key = ?2",
                params![table, key, encode(attributes), chrono::Utc::now().timestamp()],
            )
            .map_err(from_rusqlite)
    }
}

impl Repository for SqliteRepository {
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
            .row(&record_type.table, &key)?
            .filter(|row| with_trashed || !is_trashed(record_type, row))
            .map(|row| Record::from_storage(record_type.clone(), row)))
    }

    fn write(&mut self, record: &mut Record) -> StoreResult<bool> {
        let table = record.table().to_string();
        let tx = self.conn.transaction().map_err(from_rusqlite)?;

        let key = match record.key().and_then(key_string) {
            Some(key) => {
                if let Ok(n) = key.parse::<i64>() {
                    bump_sequence(&tx, &table, n)?;
                }
                key
            }
            None => {
                let next = next_key(&tx, &table)?;
                let key_name = record.key_name().to_string();
                record.set(key_name, next);
                tracing::debug!(table = %table, key = next, "assigned key");
                next.to_string()
            }
        };

        tx.execute(
            "INSERT INTO records (table_name, record_key, attributes, written_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(table_name, record_key) DO UPDATE SET
                attributes = excluded.attributes,
                written_at = excluded.written_at",
            params![
                table,
                key,
                encode(record.attributes()),
                chrono::Utc::now().timestamp()
            ],
        )
        .map_err(from_rusqlite)?;
        tx.commit().map_err(from_rusqlite)?;

        Ok(true)
    }

    fn delete(&mut self, record: &mut Record) -> StoreResult<bool> {
        let Some(key) = record.key().and_then(key_string) else {
            return Ok(false);
        };
        let table = record.table().to_string();

        match record.record_type().soft_delete_column.clone() {
            Some(column) => {
                if self.row(&table, &key)?.is_none() {
                    return Ok(false);
                }
                record.set(column, timestamp(None));
                Ok(self.update_attributes(&table, &key, record.attributes())? > 0)
            }
            None => {
                let removed = self
                    .conn
                    .execute(
                        "DELETE FROM records WHERE table_name = ?1 AND record_key = ?2",
                        params![table, key],
                    )
                    .map_err(from_rusqlite)?;
                Ok(removed > 0)
            }
        }
    }

    fn attach(
        &mut self,
        pivot: &Pivot,
        parent_key: &Value,
        related_key: &Value,
    ) -> StoreResult<bool> {
        let (Some(parent), Some(related)) = (key_string(parent_key), key_string(related_key))
        else {
            return Ok(false);
        };
        self.conn
            .execute(
                "INSERT OR IGNORE INTO pivots (pivot_table, parent_key, related_key)
                 VALUES (?1, ?2, ?3)",
                params![pivot.table, parent, related],
            )
            .map_err(from_rusqlite)?;
        Ok(true)
    }

    fn is_taken(&self, probe: &UniqueProbe<'_>) -> StoreResult<bool> {
        Ok(self
            .rows_with(probe.table, probe.column)?
            .iter()
            .any(|row| probe.matches(row)))
    }
}

fn next_key(tx: &Transaction<'_>, table: &str) -> Result<i64> {
    tx.query_row(
        "INSERT INTO key_sequences (table_name, last_key) VALUES (?1, 1)
         ON CONFLICT(table_name) DO UPDATE SET last_key = last_key + 1
         RETURNING last_key",
        [table],
        |row| row.get(0),
    )
    .map_err(from_rusqlite)
}

fn bump_sequence(tx: &Transaction<'_>, table: &str, key: i64) -> Result<()> {
    tx.execute(
        "INSERT INTO key_sequences (table_name, last_key) VALUES (?1, ?2)
         ON CONFLICT(table_name) DO UPDATE SET last_key = MAX(last_key, excluded.last_key)",
        params![table, key],
    )
    .map_err(from_rusqlite)?;
    Ok(())
}

fn encode(attributes: &Attributes) -> String {
    Value::Object(attributes.clone()).to_string()
}

fn decode(table: &str, key: &str, text: &str) -> Result<Attributes> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(corrupt_row(table, key, &format!("expected an object, found {}", other))),
        Err(e) => Err(corrupt_row(table, key, &e.to_string())),
    }
}

/// JSON path selecting a top-level attribute
fn json_path(column: &str) -> String {
    format!("$.\"{}\"", column.replace('"', "\\\""))
}
