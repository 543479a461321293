#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use cascade_core::collab::StaticInput;
use cascade_core::logging_facility::test_capture::init_test_capture;
use cascade_core::model::ValidationState;
use cascade_core::rules::MapCatalog;
use cascade_core::{
    CascadeError, EngineConfig, Hook, HookMode, HookOutcome, Messages, ModelEvent, RecordType,
    Registry, Request, RuleSpec,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn first_error(record: &cascade_core::Record, path: &str) -> Option<String> {
    record
        .errors()
        .flatten(Some(path))
        .and_then(|f| f.as_leaf().map(str::to_string))
}

#[test]
fn test_valid_record_passes_and_is_hydrated() {
    // Given a new post and input with a title
    let engine = common::engine();
    let mut post = engine.make("Post").unwrap();
    let request = Request::new().with_json(json!({ "title": "Hello", "rating": 5 }));

    // When validated
    let ok = engine.validate(&mut post, &request);

    // Then it passes and only fillable fields were assigned
    assert!(ok);
    assert_eq!(post.state(), ValidationState::Valid);
    assert!(post.errors().is_empty());
    assert!(post.failure().is_none());
    assert_eq!(post.get("title"), Some(&json!("Hello")));
    assert!(post.get("rating").is_none());
}

#[test]
fn test_invalid_record_collects_messages() {
    // Given a post without a title
    let engine = common::engine();
    let mut post = engine.make("Post").unwrap();

    // When validated
    let ok = engine.validate(&mut post, &Request::new().with_json(json!({ "body": "text" })));

    // Then the required message is recorded and the failure explains it
    assert!(!ok);
    assert_eq!(post.state(), ValidationState::Invalid);
    assert_eq!(
        first_error(&post, "title").as_deref(),
        Some("The title field is required.")
    );
    assert_eq!(
        post.failure(),
        Some(&CascadeError::ValidationFailed {
            record_type: "Post".to_string(),
            error_count: 1
        })
    );
}

#[test]
fn test_request_rules_replace_declared_rules() {
    let engine = common::engine();
    let mut post = engine.make("Post").unwrap();
    let request = Request::new()
        .with_rules(RuleSpec::new().field("body", "required|min:10"))
        .with_json(json!({ "body": "short" }));

    let ok = engine.validate(&mut post, &request);

    // the declared `title` rule is not applied
    assert!(!ok);
    assert!(!post.errors().has("title"));
    assert_eq!(
        first_error(&post, "body").as_deref(),
        Some("The body must be at least 10 characters.")
    );
}

#[test]
fn test_request_messages_override_templates() {
    let engine = common::engine();
    let mut post = engine.make("Post").unwrap();
    let request = Request::new()
        .with_messages(Messages::new().with("title.required", "Every post needs a :attribute."))
        .with_json(json!({}));

    assert!(!engine.validate(&mut post, &request));
    assert_eq!(
        first_error(&post, "title").as_deref(),
        Some("Every post needs a title.")
    );
}

#[test]
fn test_catalog_messages_are_used_when_request_has_none() {
    // Given a catalog entry for Post.title.required
    let engine = common::engine().with_catalog(
        MapCatalog::new().with("validation/Post.title.required", "Posts must be titled."),
    );
    let mut post = engine.make("Post").unwrap();

    // When validated without a title
    assert!(!engine.validate(&mut post, &Request::new().with_json(json!({}))));

    // Then the catalog text is used
    assert_eq!(
        first_error(&post, "title").as_deref(),
        Some("Posts must be titled.")
    );
}

#[test]
fn test_catalog_respects_configured_folder() {
    let config = EngineConfig::from_toml_str("language_folder = \"lang\"").unwrap();
    let engine = common::engine()
        .with_config(config)
        .with_catalog(MapCatalog::new().with("lang/Post.title.required", "From lang."));
    let mut post = engine.make("Post").unwrap();

    assert!(!engine.validate(&mut post, &Request::new().with_json(json!({}))));
    assert_eq!(first_error(&post, "title").as_deref(), Some("From lang."));
}

#[test]
fn test_before_validate_hook_vetoes() {
    // Given a type whose before_validate hook stops
    let mut registry = Registry::new();
    registry.register(
        RecordType::new("Locked", "locked")
            .with_rules(RuleSpec::new().field("name", "required"))
            .with_hook(Hook::BeforeValidate, |_| HookOutcome::Stop),
    );
    let engine = common::engine_with(registry);
    let mut record = engine.make("Locked").unwrap();

    // When validated
    let ok = engine.validate(&mut record, &Request::new().with_json(json!({ "name": "x" })));

    // Then validation is aborted before any rule ran
    assert!(!ok);
    assert!(record.errors().is_empty());
    assert_eq!(
        record.failure(),
        Some(&CascadeError::HookVetoed {
            hook: "before_validate".to_string(),
            record_type: "Locked".to_string()
        })
    );
}

#[test]
fn test_validating_listener_vetoes() {
    let mut engine = common::engine();
    engine.listen("Post", ModelEvent::Validating, |_| HookOutcome::Stop);
    let mut post = engine.make("Post").unwrap();

    let ok = engine.validate(&mut post, &Request::new().with_json(json!({ "title": "T" })));

    assert!(!ok);
    assert!(matches!(
        post.failure(),
        Some(CascadeError::HookVetoed { hook, .. }) if hook == "validating"
    ));
}

#[test]
fn test_validated_listener_cannot_veto() {
    let mut engine = common::engine();
    engine.listen("Post", ModelEvent::Validated, |_| HookOutcome::Stop);
    let mut post = engine.make("Post").unwrap();

    assert!(engine.validate(&mut post, &Request::new().with_json(json!({ "title": "T" }))));
}

#[test]
fn test_hook_runs_once_in_either_mode() {
    for mode in [HookMode::Direct, HookMode::Listeners] {
        // Given a before_validate hook that counts its calls
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut registry = Registry::new();
        registry.register(
            RecordType::new("Counted", "counted")
                .with_fillable(["name"])
                .with_rules(RuleSpec::new().field("name", "required"))
                .with_hook(Hook::BeforeValidate, move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    HookOutcome::Continue
                }),
        );
        let engine = common::engine_with(registry)
            .with_config(EngineConfig::default().with_hook_mode(mode));
        let mut record = engine.make("Counted").unwrap();

        // When validated
        assert!(engine.validate(&mut record, &Request::new().with_json(json!({ "name": "n" }))));

        // Then the hook fired exactly once
        assert_eq!(calls.load(Ordering::SeqCst), 1, "mode {:?}", mode);
    }
}

#[test]
fn test_input_source_supplies_missing_data_and_receives_flash() {
    // Given an input source with a session and an invalid title
    let fields = common::payload(json!({ "title": "", "body": "kept for redisplay" }));
    let input = Arc::new(StaticInput::new(fields.clone()).with_session());
    let engine = common::engine().with_input(input.clone());
    let mut post = engine.make("Post").unwrap();

    // When validated without explicit data
    let ok = engine.validate(&mut post, &Request::new());

    // Then the input was used and flashed back on failure
    assert!(!ok);
    assert_eq!(post.get("body"), Some(&json!("kept for redisplay")));
    assert_eq!(input.flashed(), vec![fields]);
}

#[test]
fn test_no_flash_without_session() {
    let input = Arc::new(StaticInput::new(common::payload(json!({ "title": "" }))));
    let engine = common::engine().with_input(input.clone());
    let mut post = engine.make("Post").unwrap();

    assert!(!engine.validate(&mut post, &Request::new()));
    assert!(input.flashed().is_empty());
}

#[test]
fn test_empty_data_does_not_fall_back_to_input() {
    let input = Arc::new(StaticInput::new(common::payload(json!({ "title": "From input" }))));
    let engine = common::engine().with_input(input);
    let mut post = engine.make("Post").unwrap();

    assert!(!engine.validate(&mut post, &Request::new().with_json(json!({}))));
    assert!(post.get("title").is_none());
}

#[test]
fn test_unique_consults_repository_and_excepts_self() {
    // Given a stored author
    let mut engine = common::engine();
    engine
        .repository_mut()
        .insert_row(
            "authors",
            "id",
            common::payload(json!({ "id": 1, "name": "Ada", "email": "ada@example.com" })),
        )
        .unwrap();

    // When a new author claims the same email
    let mut other = engine.make("Author").unwrap();
    let taken = engine.validate(
        &mut other,
        &Request::new().with_json(json!({ "name": "Eve", "email": "ada@example.com" })),
    );

    // Then it is rejected, while the stored author revalidates cleanly
    assert!(!taken);
    assert_eq!(
        first_error(&other, "email").as_deref(),
        Some("The email has already been taken.")
    );
    let mut ada = engine.find("Author", &json!(1)).unwrap().unwrap();
    assert!(engine.validate(&mut ada, &Request::new().with_json(json!({ "name": "Ada Lovelace" }))));
}

#[test]
fn test_record_without_rules_is_trivially_valid() {
    let mut registry = Registry::new();
    registry.register(RecordType::new("Note", "notes").with_fillable(["text"]));
    let engine = common::engine_with(registry);
    let mut note = engine.make("Note").unwrap();

    assert!(engine.validate(&mut note, &Request::new().with_json(json!({ "text": "x" }))));
    assert_eq!(note.state(), ValidationState::Valid);
    assert!(note.diff().contains("text"));
}

#[test]
fn test_non_scalar_attributes_are_dropped() {
    let engine = common::engine();
    let mut post = engine.make("Post").unwrap();
    post.set("title", "T");
    post.set("comments", json!([{ "body": "nested" }]));

    assert!(engine.validate(&mut post, &Request::new().with_json(json!({}))));
    assert!(post.get("comments").is_none());
}

#[test]
fn test_recursive_merges_indexed_child_errors() {
    // Given a post with one good and one bad comment
    let engine = common::engine();
    let mut post = engine.make("Post").unwrap();
    let request = Request::new().with_json(json!({
        "title": "Hello",
        "comments": [{ "body": "great post" }, { "body": "no" }]
    }));

    // When validated recursively
    let ok = engine.validate_recursive(&mut post, &request);

    // Then only the failing index appears under the relation name
    assert!(!ok);
    assert!(!post.errors().has("title"));
    let comments = post.errors().subtree("comments").unwrap();
    assert!(!comments.has(0));
    assert_eq!(
        first_error(&post, "comments.1.body").as_deref(),
        Some("The body must be at least 3 characters.")
    );
    assert_eq!(
        post.failure(),
        Some(&CascadeError::RelationshipValidationFailed {
            record_type: "Post".to_string(),
            relations: vec!["comments".to_string()]
        })
    );
}

#[test]
fn test_recursive_single_relation_errors_sit_directly_under_name() {
    let engine = common::engine();
    let mut author = engine.make("Author").unwrap();
    let request = Request::new().with_json(json!({
        "name": "Ada",
        "profile": { "bio": "a biography that is far too long" }
    }));

    assert!(!engine.validate_recursive(&mut author, &request));
    assert_eq!(
        first_error(&author, "profile.bio").as_deref(),
        Some("The bio may not be greater than 20 characters.")
    );
}

#[test]
fn test_recursive_own_failure_counts_nested_errors() {
    let engine = common::engine();
    let mut post = engine.make("Post").unwrap();
    let request = Request::new().with_json(json!({
        "comments": [{ "body": "" }]
    }));

    assert!(!engine.validate_recursive(&mut post, &request));
    assert_eq!(
        post.failure(),
        Some(&CascadeError::ValidationFailed {
            record_type: "Post".to_string(),
            error_count: 2
        })
    );
}

#[test]
fn test_recursive_nested_many_errors() {
    // Given an author with a post whose comment is invalid
    let engine = common::engine();
    let mut author = engine.make("Author").unwrap();
    let request = Request::new().with_json(json!({
        "name": "Ada",
        "posts": [{ "title": "Ok", "comments": [{ "body": "fine" }, { "body": "" }] }]
    }));

    // When validated recursively
    assert!(!engine.validate_recursive(&mut author, &request));

    // Then the error path walks the whole tree
    assert_eq!(
        first_error(&author, "posts.0.comments.1.body").as_deref(),
        Some("The body field is required.")
    );
}

#[test]
fn test_recursive_honors_conditions() {
    let engine = common::engine();
    let mut post = engine.make("Post").unwrap();
    let request = Request::new()
        .with_conditions(cascade_core::Conditions::new().except(["comments"]))
        .with_json(json!({ "title": "T", "comments": [{ "body": "" }] }));

    assert!(engine.validate_recursive(&mut post, &request));
}

#[test]
fn test_scoped_rules_apply_to_relation() {
    let engine = common::engine();
    let mut post = engine.make("Post").unwrap();
    let request = Request::new()
        .with_rules(
            RuleSpec::new()
                .field("title", "required")
                .relation("comments", RuleSpec::new().field("body", "max:4")),
        )
        .with_json(json!({ "title": "T", "comments": [{ "body": "too long" }] }));

    assert!(!engine.validate_recursive(&mut post, &request));
    assert_eq!(
        first_error(&post, "comments.0.body").as_deref(),
        Some("The body may not be greater than 4 characters.")
    );
}

#[test]
fn test_validate_logs_operation_boundaries() {
    // Given a type name no other test uses
    let capture = init_test_capture();
    let mut registry = Registry::new();
    registry.register(
        RecordType::new("LoggedPost", "logged_posts")
            .with_rules(RuleSpec::new().field("title", "required")),
    );
    let engine = common::engine_with(registry);
    let mut record = engine.make("LoggedPost").unwrap();

    // When validation fails
    assert!(!engine.validate(&mut record, &Request::new().with_json(json!({}))));

    // Then one start and one end_error carry the record type and error count
    let ours = |e: &cascade_core::logging_facility::CapturedEvent| {
        e.field("record_type") == Some("LoggedPost")
    };
    let starts: Vec<_> = capture
        .matching("validate", "start")
        .into_iter()
        .filter(|e| ours(e))
        .collect();
    let errors: Vec<_> = capture
        .matching("validate", "end_error")
        .into_iter()
        .filter(|e| ours(e))
        .collect();
    assert_eq!(starts.len(), 1);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field("error_count"), Some("1"));
    assert_eq!(errors[0].field("err_code"), Some("ERR_VALIDATION_FAILED"));
}
