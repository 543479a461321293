//! Cascade Core - rule-driven recursive validation and persistence
//!
//! This crate provides the kernel for saving tree-shaped record graphs:
//! - Record model with declared relations, hooks and rule specifications
//! - RuleSet Builder with placeholder resolution and `unique` expansion
//! - Diff Tracker and hierarchical Error Tree
//! - Relationship Classifier for nested input payloads
//! - Validation and Persistence Engines with partial-success cascades
//!
//! Storage, rule evaluation, message lookup, hashing and request input are
//! collaborators behind traits, each with a default implementation here.

pub mod collab;
pub mod config;
pub mod diff;
pub mod engine;
pub mod error_tree;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod path;
pub mod relations;
pub mod rules;
pub mod store;

// Re-export commonly used types
pub use config::{EngineConfig, HookMode};
pub use diff::{Change, Diff};
pub use engine::{Engine, Request};
pub use error_tree::ErrorTree;
pub use errors::{CascadeError, ExError, ExErrorKind, Result};
pub use model::{Hook, HookOutcome, ModelEvent, Record, RecordType, Registry, Relation};
pub use relations::Conditions;
pub use rules::{Messages, RuleSpec};
pub use store::{MemoryRepository, Repository};
