#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use cascade_core::model::{Pivot, Record};
use cascade_core::rules::Rule;
use cascade_core::store::{Repository, UniqueProbe};
use cascade_store::SqliteRepository;
use serde_json::json;
use tempfile::TempDir;

fn note(registry: &cascade_core::Registry, text: &str) -> Record {
    let mut record = registry.make("Note").unwrap();
    record.set("text", text);
    record
}

#[test]
fn test_write_then_find_round_trips_attributes() {
    // Given a new note
    let registry = common::registry();
    let mut repo = SqliteRepository::open_in_memory().unwrap();
    let mut record = note(&registry, "hello");

    // When written
    assert!(repo.write(&mut record).unwrap());

    // Then it is found under its assigned key with the same attributes
    let note_type = registry.get("Note").unwrap();
    let found = repo.find(note_type, &json!(1), false).unwrap().unwrap();
    assert!(found.exists());
    assert_eq!(found.get("text"), Some(&json!("hello")));
    assert_eq!(found.key(), Some(&json!(1)));
}

#[test]
fn test_find_accepts_string_key() {
    let registry = common::registry();
    let mut repo = SqliteRepository::open_in_memory().unwrap();
    repo.write(&mut note(&registry, "hello")).unwrap();

    let found = repo
        .find(registry.get("Note").unwrap(), &json!("1"), false)
        .unwrap();

    assert!(found.is_some());
}

#[test]
fn test_write_existing_key_updates_row() {
    let registry = common::registry();
    let mut repo = SqliteRepository::open_in_memory().unwrap();
    let mut record = note(&registry, "draft");
    repo.write(&mut record).unwrap();

    record.set("text", "final");
    repo.write(&mut record).unwrap();

    assert_eq!(repo.count("notes").unwrap(), 1);
    assert_eq!(
        repo.row("notes", "1").unwrap().unwrap().get("text"),
        Some(&json!("final"))
    );
}

#[test]
fn test_soft_delete_hides_row_unless_trashed_requested() {
    // Given a stored note (soft deletes enabled)
    let registry = common::registry();
    let note_type = registry.get("Note").unwrap();
    let mut repo = SqliteRepository::open_in_memory().unwrap();
    let mut record = note(&registry, "hello");
    repo.write(&mut record).unwrap();

    // When deleted
    assert!(repo.delete(&mut record).unwrap());

    // Then the row remains but is stamped
    assert_eq!(repo.count("notes").unwrap(), 1);
    assert!(record.get("deleted_at").is_some_and(|v| v.is_string()));
    assert!(repo.find(note_type, &json!(1), false).unwrap().is_none());
    assert!(repo.find(note_type, &json!(1), true).unwrap().is_some());
}

#[test]
fn test_hard_delete_removes_row() {
    let registry = common::registry();
    let mut repo = SqliteRepository::open_in_memory().unwrap();
    let mut member = registry.make("Member").unwrap();
    member.set("name", "Ada");
    repo.write(&mut member).unwrap();

    assert!(repo.delete(&mut member).unwrap());
    assert!(!repo.delete(&mut member).unwrap());

    assert_eq!(repo.count("members").unwrap(), 0);
}

#[test]
fn test_delete_without_key_is_declined() {
    let registry = common::registry();
    let mut repo = SqliteRepository::open_in_memory().unwrap();

    assert!(!repo.delete(&mut note(&registry, "never stored")).unwrap());
}

#[test]
fn test_attach_ignores_duplicate_links() {
    let mut repo = SqliteRepository::open_in_memory().unwrap();
    let pivot = Pivot::new("label_note", "note_id", "label_id");

    assert!(repo.attach(&pivot, &json!(1), &json!(2)).unwrap());
    assert!(repo.attach(&pivot, &json!(1), &json!(2)).unwrap());
    assert!(repo.attach(&pivot, &json!(1), &json!(3)).unwrap());
    assert!(!repo.attach(&pivot, &json!(null), &json!(3)).unwrap());

    assert_eq!(
        repo.pivot_rows("label_note").unwrap(),
        vec![
            ("1".to_string(), "2".to_string()),
            ("1".to_string(), "3".to_string())
        ]
    );
}

#[test]
fn test_is_taken_applies_except_and_wheres() {
    // Given two members
    let registry = common::registry();
    let mut repo = SqliteRepository::open_in_memory().unwrap();
    for (name, email) in [("Ada", "ada@example.com"), ("Bob", "bob@example.com")] {
        let mut member = registry.make("Member").unwrap();
        member.set("name", name);
        member.set("email", email);
        repo.write(&mut member).unwrap();
    }
    let value = json!("ada@example.com");

    // When probing Ada's email
    let plain = Rule::parse("unique:members,email");
    let except_self = Rule::parse("unique:members,email,1,id");
    let scoped = Rule::parse("unique:members,email,NULL,id,name,Bob");

    // Then only the unrestricted probe conflicts
    assert!(repo.is_taken(&UniqueProbe::from_rule(&plain, &value)).unwrap());
    assert!(!repo.is_taken(&UniqueProbe::from_rule(&except_self, &value)).unwrap());
    assert!(!repo.is_taken(&UniqueProbe::from_rule(&scoped, &value)).unwrap());
}

#[test]
fn test_keys_are_allocated_per_table() {
    let registry = common::registry();
    let mut repo = SqliteRepository::open_in_memory().unwrap();
    let mut first_note = note(&registry, "one");
    let mut member = registry.make("Member").unwrap();
    let mut second_note = note(&registry, "two");

    repo.write(&mut first_note).unwrap();
    repo.write(&mut member).unwrap();
    repo.write(&mut second_note).unwrap();

    assert_eq!(member.key(), Some(&json!(1)));
    assert_eq!(second_note.key(), Some(&json!(2)));
}

#[test]
fn test_file_database_survives_reopen() {
    // Given a database file with one note
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cascade.db");
    let registry = common::registry();
    {
        let mut repo = SqliteRepository::open(&path).unwrap();
        repo.write(&mut note(&registry, "persisted")).unwrap();
    }

    // When reopened
    let mut repo = SqliteRepository::open(&path).unwrap();

    // Then the row and the key sequence are still there
    let found = repo
        .find(registry.get("Note").unwrap(), &json!(1), false)
        .unwrap()
        .unwrap();
    assert_eq!(found.get("text"), Some(&json!("persisted")));
    let mut next = note(&registry, "next");
    repo.write(&mut next).unwrap();
    assert_eq!(next.key(), Some(&json!(2)));
}

#[test]
fn test_corrupt_row_is_reported() {
    let registry = common::registry();
    let repo = SqliteRepository::open_in_memory().unwrap();
    repo.connection()
        .execute(
            "INSERT INTO records (table_name, record_key, attributes, written_at)
             VALUES ('notes', '9', '\"not an object\"', 0)",
            [],
        )
        .unwrap();

    let err = repo
        .find(registry.get("Note").unwrap(), &json!(9), false)
        .unwrap_err();

    assert_eq!(err.code(), "ERR_SERIALIZATION");
    assert_eq!(err.record_key(), Some("9"));
}
