use spacesync_core_types::RunId;
use thiserror::Error;

/// Result type alias using SyncError
pub type Result<T> = std::result::Result<T, SyncError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code used in log events, operator-facing
/// summaries and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Pre-UI
    Configuration,

    // Apply-time
    Permission,
    PlatformLimit,
    Unexpected,
    RollbackPartialFailure,

    // Workflow
    InvalidTransition,
    Concurrency,

    // Settings and encoding
    Serialization,
    Persistence,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::Configuration => "ERR_CONFIGURATION",
            ExErrorKind::Permission => "ERR_PERMISSION",
            ExErrorKind::PlatformLimit => "ERR_PLATFORM_LIMIT",
            ExErrorKind::Unexpected => "ERR_UNEXPECTED",
            ExErrorKind::RollbackPartialFailure => "ERR_ROLLBACK_PARTIAL_FAILURE",
            ExErrorKind::InvalidTransition => "ERR_INVALID_TRANSITION",
            ExErrorKind::Concurrency => "ERR_CONCURRENCY",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
        }
    }

    /// Whether an error of this kind stops the remaining plan.
    ///
    /// Platform-limit problems are absorbed by the overwrite guard and
    /// rollback failures are downgraded to notes.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ExErrorKind::PlatformLimit | ExErrorKind::RollbackPartialFailure
        )
    }
}

/// Canonical structured error type
///
/// Carries classification plus the context needed to render a useful
/// operator-facing message and a structured log event.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity: Option<String>,
    space_id: Option<u64>,
    run_id: Option<RunId>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity: None,
            space_id: None,
            run_id: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity context (display key of the role/category/channel)
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Add space context
    pub fn with_space_id(mut self, space_id: u64) -> Self {
        self.space_id = Some(space_id);
        self
    }

    /// Add run ID context
    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the entity context, if any
    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    /// Get the space context, if any
    pub fn space_id(&self) -> Option<u64> {
        self.space_id
    }

    /// Get the run ID context, if any
    pub fn run_id(&self) -> Option<&RunId> {
        self.run_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
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
        if let Some(entity) = &self.entity {
            write!(f, " (entity: {})", entity)?;
        }
        if let Some(space_id) = self.space_id {
            write!(f, " (space: {})", space_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for sync operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    // ===== Pre-UI Errors =====
    /// Source/target unset, identical or inaccessible
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    /// Another run already targets the same space
    #[error("A sync run is already in progress for space {space_id}")]
    RunInProgress { space_id: u64 },

    // ===== Apply-time Errors =====
    /// The platform rejected a mutation for lack of permission
    #[error("Permission denied during {op} on {entity}: {message}")]
    Permission {
        op: String,
        entity: String,
        message: String,
    },

    /// An overwrite set exceeds the platform ceiling
    #[error("Overwrite set for {entity} has {count} entries (limit {cap})")]
    PlatformLimit {
        entity: String,
        count: usize,
        cap: usize,
    },

    /// Any other failure while talking to the platform
    #[error("Unexpected error during {op}: {message}")]
    Unexpected { op: String, message: String },

    /// A compensation failed while rolling back
    #[error("Rollback step '{compensation}' failed: {message}")]
    RollbackPartialFailure {
        compensation: String,
        message: String,
    },

    // ===== Workflow Errors =====
    /// A confirmation event arrived in a state that cannot accept it
    #[error("Invalid confirmation transition: {event} while {state}")]
    InvalidTransition { state: String, event: String },

    // ===== Generic Errors =====
    /// Settings could not be loaded or stored
    #[error("Settings error: {message}")]
    Settings { message: String },

    /// Serialization error (JSON/TOML encoding/decoding)
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl SyncError {
    /// Shorthand for a configuration error
    pub fn configuration(reason: impl Into<String>) -> Self {
        SyncError::Configuration {
            reason: reason.into(),
        }
    }

    /// Canonical kind of this error
    pub fn kind(&self) -> ExErrorKind {
        match self {
            SyncError::Configuration { .. } => ExErrorKind::Configuration,
            SyncError::RunInProgress { .. } => ExErrorKind::Concurrency,
            SyncError::Permission { .. } => ExErrorKind::Permission,
            SyncError::PlatformLimit { .. } => ExErrorKind::PlatformLimit,
            SyncError::Unexpected { .. } => ExErrorKind::Unexpected,
            SyncError::RollbackPartialFailure { .. } => ExErrorKind::RollbackPartialFailure,
            SyncError::InvalidTransition { .. } => ExErrorKind::InvalidTransition,
            SyncError::Settings { .. } => ExErrorKind::Persistence,
            SyncError::Serialization { .. } => ExErrorKind::Serialization,
        }
    }

    /// Whether this error aborts the remaining plan (and triggers rollback
    /// in transactional mode)
    pub fn aborts_run(&self) -> bool {
        self.kind().is_fatal()
    }
}

/// Conversion from SyncError to ExError
impl From<SyncError> for ExError {
    fn from(err: SyncError) -> Self {
        let kind = err.kind();
        match err {
            SyncError::Configuration { reason } => ExError::new(kind)
                .with_op("configure")
                .with_message(reason),

            SyncError::RunInProgress { space_id } => ExError::new(kind)
                .with_op("run")
                .with_space_id(space_id)
                .with_message("A sync run is already in progress"),

            SyncError::Permission {
                op,
                entity,
                message,
            } => ExError::new(kind)
                .with_op(op)
                .with_entity(entity)
                .with_message(message),

            SyncError::PlatformLimit { entity, count, cap } => ExError::new(kind)
                .with_op("overwrite_guard")
                .with_entity(entity)
                .with_message(format!("{} overwrites exceed the limit of {}", count, cap)),

            SyncError::Unexpected { op, message } => {
                ExError::new(kind).with_op(op).with_message(message)
            }

            SyncError::RollbackPartialFailure {
                compensation,
                message,
            } => ExError::new(kind)
                .with_op("rollback")
                .with_entity(compensation)
                .with_message(message),

            SyncError::InvalidTransition { state, event } => ExError::new(kind)
                .with_op("confirmation")
                .with_message(format!("{} while {}", event, state)),

            SyncError::Settings { message } => {
                ExError::new(kind).with_op("settings").with_message(message)
            }

            SyncError::Serialization { message } => ExError::new(kind).with_message(message),
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes_are_stable() {
        assert_eq!(ExErrorKind::Configuration.code(), "ERR_CONFIGURATION");
        assert_eq!(ExErrorKind::Permission.code(), "ERR_PERMISSION");
        assert_eq!(ExErrorKind::PlatformLimit.code(), "ERR_PLATFORM_LIMIT");
        assert_eq!(
            ExErrorKind::RollbackPartialFailure.code(),
            "ERR_ROLLBACK_PARTIAL_FAILURE"
        );
    }

    #[test]
    fn test_platform_limit_and_rollback_failures_are_not_fatal() {
        let limit = SyncError::PlatformLimit {
            entity: "general".to_string(),
            count: 150,
            cap: 100,
        };
        let rollback = SyncError::RollbackPartialFailure {
            compensation: "delete role Officer".to_string(),
            message: "gone".to_string(),
        };
        assert!(!limit.aborts_run());
        assert!(!rollback.aborts_run());

        let perm = SyncError::Permission {
            op: "create_role".to_string(),
            entity: "Officer".to_string(),
            message: "missing manage roles".to_string(),
        };
        assert!(perm.aborts_run());
    }

    #[test]
    fn test_sync_error_converts_with_context() {
        let err = SyncError::Permission {
            op: "edit_channel".to_string(),
            entity: "general".to_string(),
            message: "forbidden".to_string(),
        };
        let ex: ExError = err.into();
        assert_eq!(ex.kind(), ExErrorKind::Permission);
        assert_eq!(ex.op(), Some("edit_channel"));
        assert_eq!(ex.entity(), Some("general"));
        assert!(ex.to_string().starts_with("[ERR_PERMISSION]"));
    }

    #[test]
    fn test_settings_failures_map_to_persistence() {
        let ex: ExError = SyncError::Settings {
            message: "cannot write settings.toml".to_string(),
        }
        .into();
        assert_eq!(ex.kind(), ExErrorKind::Persistence);
        assert_eq!(ex.op(), Some("settings"));
    }
}
