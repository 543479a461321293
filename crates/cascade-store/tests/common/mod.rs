use cascade_core::model::Pivot;
use cascade_core::{Engine, RecordType, Registry, Relation, RuleSpec};
use cascade_store::SqliteRepository;

/// Member -> Note (many), Note -> Member (belongs to), Note <-> Label (pivot)
#[allow(dead_code)]
pub fn registry() -> Registry {
    let mut registry = Registry::new();
    registry.register(
        RecordType::new("Member", "members")
            .with_fillable(["name", "email"])
            .with_rules(
                RuleSpec::new()
                    .field("name", "required")
                    .field("email", "required|email|unique"),
            )
            .with_relation("notes", Relation::has_many("Note", "member_id")),
    );
    registry.register(
        RecordType::new("Note", "notes")
            .with_fillable(["text", "member_id"])
            .with_soft_deletes()
            .with_rules(RuleSpec::new().field("text", "required|min:2"))
            .with_relation("member", Relation::belongs_to("Member", "member_id"))
            .with_relation(
                "labels",
                Relation::belongs_to_many("Label", Pivot::new("label_note", "note_id", "label_id")),
            ),
    );
    registry.register(
        RecordType::new("Label", "labels")
            .with_fillable(["name"])
            .with_rules(RuleSpec::new().field("name", "required|alpha_dash")),
    );
    registry
}

#[allow(dead_code)]
pub fn engine() -> Engine<SqliteRepository> {
    Engine::new(registry(), SqliteRepository::open_in_memory().unwrap())
}
