//! Record model: schema, live records and the type registry

pub mod hooks;
pub mod record;
pub mod record_type;
pub mod registry;
pub mod relation;
pub mod value;

pub use hooks::{Callback, Hook, HookOutcome, ModelEvent};
pub use record::{Record, Related, ValidationState, BOOKKEEPING_FIELDS};
pub use record_type::RecordType;
pub use registry::Registry;
pub use relation::{Cardinality, Pivot, Relation, RelationKind};
pub use value::{Attributes, Payload};
