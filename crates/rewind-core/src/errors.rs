use rewind_core_types::OwnerKey;
use thiserror::Error;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that can be used for programmatic
/// error handling and test assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Structural/Validation
    InvalidInput,
    NotFound,
    /// A snapshot row names an owner type with no registered reconstruction
    UnknownOwnerType,
    ConstraintViolation,

    // Integration/IO
    Io,
    Serialization,
    Persistence,
    Configuration,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::UnknownOwnerType => "ERR_UNKNOWN_OWNER_TYPE",
            ExErrorKind::ConstraintViolation => "ERR_CONSTRAINT_VIOLATION",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Configuration => "ERR_CONFIGURATION",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification for programmatic handling plus the context needed
/// to debug a failed snapshot operation.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    owner: Option<OwnerKey>,
    snapshot_id: Option<i64>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            owner: None,
            snapshot_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add the owning record
    pub fn with_owner(mut self, owner: OwnerKey) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Add snapshot ID context
    pub fn with_snapshot_id(mut self, id: i64) -> Self {
        self.snapshot_id = Some(id);
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

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn owner(&self) -> Option<&OwnerKey> {
        self.owner.as_ref()
    }

    pub fn snapshot_id(&self) -> Option<i64> {
        self.snapshot_id
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
        if let Some(owner) = &self.owner {
            write!(f, " (owner: {})", owner)?;
        }
        if let Some(id) = self.snapshot_id {
            write!(f, " (snapshot_id: {})", id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain errors raised by the snapshot engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RewindError {
    /// The snapshot does not exist or lies outside the retention window
    #[error("Snapshot {snapshot_id} not found for {owner}")]
    SnapshotNotFound { owner: OwnerKey, snapshot_id: i64 },

    /// The retention window of the record is empty
    #[error("No snapshots in the retention window for {owner}")]
    NoSnapshots { owner: OwnerKey },

    #[error("No reconstruction registered for owner type: {owner_type}")]
    UnregisteredOwnerType { owner_type: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl From<RewindError> for ExError {
    fn from(err: RewindError) -> Self {
        let message = err.to_string();
        match err {
            RewindError::SnapshotNotFound { owner, snapshot_id } => {
                ExError::new(ExErrorKind::NotFound)
                    .with_owner(owner)
                    .with_snapshot_id(snapshot_id)
                    .with_message(message)
            }
            RewindError::NoSnapshots { owner } => ExError::new(ExErrorKind::NotFound)
                .with_owner(owner)
                .with_message(message),
            RewindError::UnregisteredOwnerType { .. } => {
                ExError::new(ExErrorKind::UnknownOwnerType).with_message(message)
            }
            RewindError::Serialization { .. } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }
        }
    }
}

impl From<serde_json::Error> for RewindError {
    fn from(err: serde_json::Error) -> Self {
        RewindError::Serialization {
            message: err.to_string(),
        }
    }
}
