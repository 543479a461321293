//! Diff computation.

use super::model::{Change, Diff};
use crate::model::{Record, BOOKKEEPING_FIELDS};
use serde_json::Value;

fn tracked(record: &Record, field: &str) -> bool {
    !BOOKKEEPING_FIELDS.contains(&field) && !record.record_type().diff_ignore.contains(field)
}

/// Field-level changes of `record` against its snapshot
///
/// Without a snapshot every attribute is new. With one, fields present on
/// either side are compared by exact JSON equality (`"0"` differs from `0`);
/// a field missing on one side compares as null.
pub fn compute_diff(record: &Record) -> Diff {
    let mut diff = Diff::new();

    let Some(original) = record.original() else {
        for (field, value) in record.attributes() {
            if tracked(record, field) {
                diff.insert(field.clone(), Change::New { new: value.clone() });
            }
        }
        return diff;
    };

    let fields = original
        .keys()
        .chain(record.attributes().keys().filter(|k| !original.contains_key(*k)));

    for field in fields {
        if !tracked(record, field) {
            continue;
        }
        let before = original.get(field).unwrap_or(&Value::Null);
        let after = record.get(field).unwrap_or(&Value::Null);
        if before != after {
            diff.insert(
                field.clone(),
                Change::Updated {
                    original: before.clone(),
                    updated: after.clone(),
                },
            );
        }
    }

    diff
}
