//! Rule specifications, their expansion, and field-level evaluation

pub mod builder;
pub mod catalog;
pub mod engine;
pub mod spec;

pub use builder::{build, BuiltRules, Rule};
pub use catalog::{MapCatalog, MessageCatalog};
pub use engine::{BasicRuleEngine, RuleEngine, RuleInput, Verdict};
pub use spec::{Messages, RuleSpec};
