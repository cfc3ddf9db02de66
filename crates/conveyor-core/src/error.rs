//! Unified error type for all layers of the application.

use crate::job::JobStatus;
use crate::validation::FieldErrors;
use thiserror::Error;

/// Unified error type for Conveyor.
///
/// The service layer maps backend failures into these kinds; the HTTP layer
/// maps the kinds into status codes. The worker never propagates any of them
/// past a job handler.
#[derive(Error, Debug)]
pub enum ConveyorError {
    /// Target resource does not exist.
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// Caller input violates a declared constraint.
    #[error("{0}")]
    Validation(FieldErrors),

    /// The state machine rejects the requested transition.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidStatusTransition { from: JobStatus, to: JobStatus },

    /// Primary-key collision on save.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The record store or schedule index failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Opaque failure from a task executor.
    #[error("executor error: {0}")]
    Executor(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A store or index call exceeded its deadline.
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Generic error wrapper.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ConveyorError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Validation(_) => 422,
            Self::InvalidStatusTransition { .. } => 409,
            // Conflicts are server-generated id collisions and a timeout is
            // a backing-store failure; both surface as internal failures.
            Self::Conflict(_)
            | Self::Storage(_)
            | Self::Executor(_)
            | Self::Configuration(_)
            | Self::Timeout(_)
            | Self::Internal(_)
            | Self::Other(_) => 500,
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
            Self::Conflict(_) => "CONFLICT",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Executor(_) => "EXECUTOR_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::Internal(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Creates a not-found error for a resource.
    #[must_use]
    pub fn not_found<T: ToString>(resource_type: &'static str, id: T) -> Self {
        Self::NotFound {
            resource_type,
            id: id.to_string(),
        }
    }

    /// Creates a storage error.
    #[must_use]
    pub fn storage<T: Into<String>>(message: T) -> Self {
        Self::Storage(message.into())
    }

    /// Creates an executor error.
    #[must_use]
    pub fn executor<T: Into<String>>(message: T) -> Self {
        Self::Executor(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for ConveyorError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::Storage(err.to_string()),
            sqlx::Error::Database(db_err) => {
                // PostgreSQL unique violation
                if db_err.code().as_deref() == Some("23505") {
                    return Self::Conflict(db_err.message().to_string());
                }
                Self::Storage(err.to_string())
            }
            _ => Self::Storage(err.to_string()),
        }
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for ConveyorError {
    fn from(err: redis::RedisError) -> Self {
        Self::Storage(err.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<deadpool_redis::PoolError> for ConveyorError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for ConveyorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON serialization error: {err}"))
    }
}

impl From<FieldErrors> for ConveyorError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ConveyorError::not_found("job", "x").status_code(), 404);
        assert_eq!(
            ConveyorError::Validation(FieldErrors::new()).status_code(),
            422
        );
        assert_eq!(
            ConveyorError::InvalidStatusTransition {
                from: JobStatus::Done,
                to: JobStatus::Cancelled,
            }
            .status_code(),
            409
        );
        assert_eq!(ConveyorError::Conflict("dup".into()).status_code(), 500);
        assert_eq!(ConveyorError::storage("down").status_code(), 500);
        assert_eq!(ConveyorError::executor("boom").status_code(), 500);
        assert_eq!(ConveyorError::Timeout("3s".into()).status_code(), 500);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ConveyorError::not_found("job", "x").error_code(), "NOT_FOUND");
        assert_eq!(
            ConveyorError::InvalidStatusTransition {
                from: JobStatus::Queued,
                to: JobStatus::Done,
            }
            .error_code(),
            "INVALID_STATUS_TRANSITION"
        );
        assert_eq!(ConveyorError::internal("x").error_code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_transition_error_message() {
        let err = ConveyorError::InvalidStatusTransition {
            from: JobStatus::Running,
            to: JobStatus::Cancelled,
        };
        assert_eq!(
            err.to_string(),
            "invalid status transition: Running -> Cancelled"
        );
    }
}
