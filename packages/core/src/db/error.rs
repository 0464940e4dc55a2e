//! Repository Store Error Types
//!
//! Errors a `MetadataStore` implementation reports back to the handlers.
//! Handlers decide which of these are caller mistakes (see
//! `HandlerError::from_store`).

use thiserror::Error;

/// Repository store errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// No entity with this GUID
    #[error("Entity not found: {guid}")]
    EntityNotFound { guid: String },

    /// No relationship with this GUID
    #[error("Relationship not found: {guid}")]
    RelationshipNotFound { guid: String },

    /// Instance exists but is not of the requested type
    #[error("Type mismatch for {guid}: expected {expected}, found {actual}")]
    TypeMismatch {
        guid: String,
        expected: String,
        actual: String,
    },

    /// GUID already in use
    #[error("Duplicate GUID: {guid}")]
    DuplicateGuid { guid: String },

    /// Search pattern is not a valid regular expression
    #[error("Invalid search pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Store cannot be reached
    #[error("Repository unavailable: {0}")]
    Unavailable(String),

    /// Store failed internally
    #[error("Repository internal error: {0}")]
    Internal(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Create an entity not found error
    pub fn entity_not_found(guid: impl Into<String>) -> Self {
        Self::EntityNotFound { guid: guid.into() }
    }

    /// Create a relationship not found error
    pub fn relationship_not_found(guid: impl Into<String>) -> Self {
        Self::RelationshipNotFound { guid: guid.into() }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(
        guid: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            guid: guid.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a duplicate GUID error
    pub fn duplicate_guid(guid: impl Into<String>) -> Self {
        Self::DuplicateGuid { guid: guid.into() }
    }

    /// Create an invalid pattern error
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Create an unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
