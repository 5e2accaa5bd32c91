//! Domain-level error types.

use thiserror::Error;

/// Domain errors - failures returned synchronously to the caller.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Already published: {0}")]
    AlreadyPublished(String),

    #[error("Already deleted: {0}")]
    AlreadyDeleted(String),

    #[error("Not published: {0}")]
    NotPublished(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NotFoundError",
            Self::Validation(_) => "ValidationError",
            Self::AlreadyPublished(_) => "AlreadyPublishedError",
            Self::AlreadyDeleted(_) => "AlreadyDeletedError",
            Self::NotPublished(_) => "NotPublishedError",
            Self::Forbidden(_) => "ForbiddenError",
            Self::Internal(_) => "InternalError",
        }
    }
}

/// Repository-level errors.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    Query(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

impl From<RepoError> for DomainError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => DomainError::NotFound {
                entity_type: "Entity",
                id: "unknown".to_string(),
            },
            other => DomainError::Internal(other.to_string()),
        }
    }
}
