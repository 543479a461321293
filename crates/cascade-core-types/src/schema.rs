//! Field keys and event names for structured logging
//!
//! The logging macros and the test capture layer both read these, so a
//! renamed key cannot drift between emitter and assertion.

pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";
pub const FIELD_TRACE_ID: &str = "trace_id";

// Record identifiers
pub const FIELD_RECORD_TYPE: &str = "record_type";
pub const FIELD_TABLE: &str = "table";
pub const FIELD_RECORD_KEY: &str = "record_key";
pub const FIELD_RELATION: &str = "relation";

// Outcome sizes
pub const FIELD_ERROR_COUNT: &str = "error_count";
pub const FIELD_RELATION_COUNT: &str = "relation_count";

pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
