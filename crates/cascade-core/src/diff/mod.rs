//! Per-field change tracking
//!
//! [`compute_diff`] compares a record against its snapshot. The engines
//! call it on every validation pass and attach related records' diffs
//! under the relation name during a cascade.

pub mod engine;
pub mod model;

pub use engine::compute_diff;
pub use model::{Change, Diff};
