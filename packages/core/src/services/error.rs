//! Handler Error Types
//!
//! Every handler operation fails with one of four kinds: the caller supplied
//! something unusable, the security verifier vetoed the call, the repository
//! store failed, or stored data could not be turned into the requested bean.

use thiserror::Error;

use crate::db::StoreError;
use crate::models::ValidationError;
use crate::security::Operation;

/// Handler operation errors
#[derive(Error, Debug)]
pub enum HandlerError {
    /// Malformed, missing or unknown caller input
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidInput { parameter: String, reason: String },

    /// Security verifier denied the operation
    #[error("User '{user_id}' is not authorized to {operation} {target}")]
    NotAuthorized {
        user_id: String,
        operation: Operation,
        target: String,
    },

    /// Repository store could not complete the operation
    #[error("Repository store failure: {0}")]
    StoreFailure(#[from] StoreError),

    /// Valid stored data did not fit the requested result shape
    #[error("Unable to construct {bean} from stored data: {reason}")]
    ConstructionFailure { bean: String, reason: String },
}

pub type HandlerResult<T> = Result<T, HandlerError>;

impl HandlerError {
    /// Create an invalid input error naming the offending parameter
    pub fn invalid_input(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Create a not authorized error
    pub fn not_authorized(
        user_id: impl Into<String>,
        operation: Operation,
        target: impl Into<String>,
    ) -> Self {
        Self::NotAuthorized {
            user_id: user_id.into(),
            operation,
            target: target.into(),
        }
    }

    /// Create a construction failure error
    pub fn construction_failure(bean: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConstructionFailure {
            bean: bean.into(),
            reason: reason.into(),
        }
    }

    /// Convert a store error, re-signaling caller mistakes as invalid input
    ///
    /// Not-found, type-mismatch and bad-pattern errors are the caller's fault
    /// and name `parameter`; everything else stays a store failure.
    pub fn from_store(err: StoreError, parameter: &str) -> Self {
        match err {
            StoreError::EntityNotFound { .. }
            | StoreError::RelationshipNotFound { .. }
            | StoreError::TypeMismatch { .. }
            | StoreError::InvalidPattern { .. } => Self::invalid_input(parameter, err.to_string()),
            other => Self::StoreFailure(other),
        }
    }

    /// Parameter named by an invalid input error
    pub fn parameter(&self) -> Option<&str> {
        match self {
            Self::InvalidInput { parameter, .. } => Some(parameter),
            _ => None,
        }
    }

    /// Whether the caller caused the failure (as opposed to the server)
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::InvalidInput { .. } | Self::NotAuthorized { .. })
    }
}

impl From<ValidationError> for HandlerError {
    fn from(err: ValidationError) -> Self {
        Self::invalid_input(err.parameter().to_string(), err.to_string())
    }
}
