use cascade_core::model::{Payload, Pivot};
use cascade_core::{Engine, MemoryRepository, RecordType, Registry, Relation, RuleSpec};
use serde_json::Value;

/// Author -> Profile (one), Author -> Post (many), Post -> Comment (many),
/// Post -> Author (belongs to), Post <-> Tag (pivot)
#[allow(dead_code)]
pub fn registry() -> Registry {
    let mut registry = Registry::new();
    registry.register(author_type());
    registry.register(post_type());
    registry.register(comment_type());
    registry.register(profile_type());
    registry.register(tag_type());
    registry
}

#[allow(dead_code)]
pub fn author_type() -> RecordType {
    RecordType::new("Author", "authors")
        .with_fillable(["name", "email", "password"])
        .with_hashed(["password"])
        .with_rules(
            RuleSpec::new()
                .field("name", "required|max:40")
                .field("email", "email|unique"),
        )
        .with_relation("profile", Relation::has_one("Profile", "author_id"))
        .with_relation("posts", Relation::has_many("Post", "author_id"))
}

#[allow(dead_code)]
pub fn post_type() -> RecordType {
    RecordType::new("Post", "posts")
        .with_fillable(["title", "body", "author_id"])
        .with_rules(RuleSpec::new().field("title", "required|max:120"))
        .with_relation("comments", Relation::has_many("Comment", "post_id"))
        .with_relation("author", Relation::belongs_to("Author", "author_id"))
        .with_relation(
            "tags",
            Relation::belongs_to_many("Tag", Pivot::new("post_tag", "post_id", "tag_id")),
        )
}

#[allow(dead_code)]
pub fn comment_type() -> RecordType {
    RecordType::new("Comment", "comments")
        .with_fillable(["body", "post_id"])
        .with_soft_deletes()
        .with_rules(RuleSpec::new().field("body", "required|min:3"))
}

#[allow(dead_code)]
pub fn profile_type() -> RecordType {
    RecordType::new("Profile", "profiles")
        .with_fillable(["bio", "author_id"])
        .with_rules(RuleSpec::new().field("bio", "max:20"))
}

#[allow(dead_code)]
pub fn tag_type() -> RecordType {
    RecordType::new("Tag", "tags")
        .with_fillable(["name"])
        .with_rules(RuleSpec::new().field("name", "required|alpha_dash"))
}

/// Engine over an empty in-memory repository
#[allow(dead_code)]
pub fn engine() -> Engine<MemoryRepository> {
    Engine::new(registry(), MemoryRepository::new())
}

/// Engine over `registry` and an empty in-memory repository
#[allow(dead_code)]
pub fn engine_with(registry: Registry) -> Engine<MemoryRepository> {
    Engine::new(registry, MemoryRepository::new())
}

/// JSON object literal as a payload
#[allow(dead_code)]
pub fn payload(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        other => panic!("payload fixture must be an object, got {}", other),
    }
}
