#![allow(clippy::unwrap_used, clippy::expect_used)]

use cascade_core::ErrorTree;
use serde_json::json;

/// title error plus comments[1].body and comments[3].body errors
fn cascade_errors() -> ErrorTree {
    let mut second = ErrorTree::new();
    second.add("body", "The body field is required.");
    second.add("body", "The body must be at least 3 characters.");
    let mut fourth = ErrorTree::new();
    fourth.add("body", "The body must be at least 3 characters.");

    let mut comments = ErrorTree::new();
    comments.add(1, second);
    comments.add(3, fourth);

    let mut tree = ErrorTree::new();
    tree.add("title", "The title field is required.");
    tree.add("comments", comments);
    tree
}

#[test]
fn test_flatten_keeps_first_message_per_branch() {
    // Given a tree with two messages on one field
    let tree = cascade_errors();

    // When flattened without a path
    let flat = tree.flatten(None).unwrap();

    // Then each branch holds only its first message
    let value = serde_json::to_value(&flat).unwrap();
    assert_eq!(
        value,
        json!({
            "comments": {
                "1": { "body": "The body field is required." },
                "3": { "body": "The body must be at least 3 characters." }
            },
            "title": "The title field is required."
        })
    );
}

#[test]
fn test_flatten_with_path_selects_branch() {
    let tree = cascade_errors();

    let branch = tree.flatten(Some("comments.3")).unwrap();

    assert_eq!(
        branch.get("body").and_then(|b| b.as_leaf()),
        Some("The body must be at least 3 characters.")
    );
}

#[test]
fn test_flatten_with_path_to_leaf() {
    let tree = cascade_errors();

    let leaf = tree.flatten(Some("comments.1.body")).unwrap();

    assert_eq!(leaf.as_leaf(), Some("The body field is required."));
}

#[test]
fn test_flatten_with_unknown_path_is_none() {
    let tree = cascade_errors();

    assert!(tree.flatten(Some("comments.2")).is_none());
    assert!(tree.flatten(Some("title.extra")).is_none());
}

#[test]
fn test_count_and_messages_cover_all_leaves() {
    let tree = cascade_errors();

    assert_eq!(tree.count(), 4);
    let paths: Vec<String> = tree.messages().into_iter().map(|(p, _)| p).collect();
    assert_eq!(
        paths,
        vec!["comments.1.body", "comments.1.body", "comments.3.body", "title"]
    );
}

#[test]
fn test_merge_appends_messages_per_key() {
    // Given two trees sharing a key
    let mut a = ErrorTree::new();
    a.add("email", "The email must be a valid email address.");
    let mut b = ErrorTree::new();
    b.add("email", "The email has already been taken.");
    b.add("name", "The name field is required.");

    // When merged
    a.merge(b);

    // Then both messages are kept under the shared key
    assert_eq!(a.count(), 3);
    assert_eq!(a.get(&"email".into()).map(<[_]>::len), Some(2));
}

#[test]
fn test_empty_tree_flattens_to_empty_branch() {
    let tree = ErrorTree::new();

    let flat = tree.flatten(None).unwrap();

    assert_eq!(serde_json::to_value(&flat).unwrap(), json!({}));
}
