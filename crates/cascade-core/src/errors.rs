use cascade_core_types::{RequestId, TraceId};
use thiserror::Error;

/// Result type alias using CascadeError
pub type Result<T> = std::result::Result<T, CascadeError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code usable in log assertions and by
/// callers that branch on why a validate/save returned `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Lifecycle
    HookVetoed,

    // Validation
    ValidationFailed,
    RelationshipValidationFailed,
    InvalidInput,

    // Schema
    UnknownRecordType,
    UnknownRelation,
    NotFound,

    // Persistence
    PersistenceWriteFailed,
    Persistence,
    ConstraintViolation,

    // Collaborators
    Hashing,
    Configuration,
    Serialization,
    Io,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::HookVetoed => "ERR_HOOK_VETOED",
            ExErrorKind::ValidationFailed => "ERR_VALIDATION_FAILED",
            ExErrorKind::RelationshipValidationFailed => "ERR_RELATIONSHIP_VALIDATION_FAILED",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::UnknownRecordType => "ERR_UNKNOWN_RECORD_TYPE",
            ExErrorKind::UnknownRelation => "ERR_UNKNOWN_RELATION",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::PersistenceWriteFailed => "ERR_PERSISTENCE_WRITE_FAILED",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::ConstraintViolation => "ERR_CONSTRAINT_VIOLATION",
            ExErrorKind::Hashing => "ERR_HASHING",
            ExErrorKind::Configuration => "ERR_CONFIGURATION",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Collaborators that touch storage or crypto report through this type;
/// the engine converts it into a `CascadeError` kind on the record.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    record_type: Option<String>,
    record_key: Option<String>,
    request_id: Option<RequestId>,
    trace_id: Option<TraceId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            record_type: None,
            record_key: None,
            request_id: None,
            trace_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add record type context
    pub fn with_record_type(mut self, record_type: impl Into<String>) -> Self {
        self.record_type = Some(record_type.into());
        self
    }

    /// Add primary key context
    pub fn with_record_key(mut self, key: impl Into<String>) -> Self {
        self.record_key = Some(key.into());
        self
    }

    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn record_type(&self) -> Option<&str> {
        self.record_type.as_deref()
    }

    pub fn record_key(&self) -> Option<&str> {
        self.record_key.as_deref()
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(record_type) = &self.record_type {
            write!(f, " (record_type: {})", record_type)?;
        }
        if let Some(key) = &self.record_key {
            write!(f, " (record_key: {})", key)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Why a validate/save/delete call returned `false`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CascadeError {
    /// A before-hook, one-shot callback or vetoable event returned `Stop`
    #[error("Hook '{hook}' vetoed the operation on {record_type}")]
    HookVetoed { hook: String, record_type: String },

    /// The rule engine rejected the record's own fields
    #[error("Validation failed for {record_type} with {error_count} error(s)")]
    ValidationFailed {
        record_type: String,
        error_count: usize,
    },

    /// One or more related records failed inside a cascade
    #[error("Related records of {record_type} failed: {}", relations.join(", "))]
    RelationshipValidationFailed {
        record_type: String,
        relations: Vec<String>,
    },

    /// The repository refused or failed a write/delete
    #[error("Repository {operation} on table {table} failed: {reason}")]
    PersistenceWriteFailed {
        table: String,
        operation: String,
        reason: String,
    },

    #[error("Unknown record type: {type_name}")]
    UnknownRecordType { type_name: String },

    #[error("Record type {record_type} declares no relation named {relation}")]
    UnknownRelation {
        record_type: String,
        relation: String,
    },

    #[error("Hashing field {field} failed: {reason}")]
    HashingFailed { field: String, reason: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl From<CascadeError> for ExError {
    fn from(err: CascadeError) -> Self {
        let message = err.to_string();
        match err {
            CascadeError::HookVetoed { hook, record_type } => {
                ExError::new(ExErrorKind::HookVetoed)
                    .with_op(hook)
                    .with_record_type(record_type)
                    .with_message(message)
            }
            CascadeError::ValidationFailed { record_type, .. } => {
                ExError::new(ExErrorKind::ValidationFailed)
                    .with_record_type(record_type)
                    .with_message(message)
            }
            CascadeError::RelationshipValidationFailed { record_type, .. } => {
                ExError::new(ExErrorKind::RelationshipValidationFailed)
                    .with_record_type(record_type)
                    .with_message(message)
            }
            CascadeError::PersistenceWriteFailed { operation, .. } => {
                ExError::new(ExErrorKind::PersistenceWriteFailed)
                    .with_op(operation)
                    .with_message(message)
            }
            CascadeError::UnknownRecordType { type_name } => {
                ExError::new(ExErrorKind::UnknownRecordType)
                    .with_record_type(type_name)
                    .with_message(message)
            }
            CascadeError::UnknownRelation { record_type, .. } => {
                ExError::new(ExErrorKind::UnknownRelation)
                    .with_record_type(record_type)
                    .with_message(message)
            }
            CascadeError::HashingFailed { .. } => ExError::new(ExErrorKind::Hashing)
                .with_op("hash")
                .with_message(message),
            CascadeError::Configuration { .. } => {
                ExError::new(ExErrorKind::Configuration).with_message(message)
            }
            CascadeError::Serialization { .. } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }
        }
    }
}

impl From<serde_json::Error> for CascadeError {
    fn from(err: serde_json::Error) -> Self {
        CascadeError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for CascadeError {
    fn from(err: toml::de::Error) -> Self {
        CascadeError::Configuration {
            message: err.to_string(),
        }
    }
}
