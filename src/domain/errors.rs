//! Domain errors for the knotcache system.

use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors that can occur in the cache core.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Query not registered: {0}")]
    QueryNotFound(String),

    #[error("Invalid query definition: {0}")]
    InvalidQuery(String),

    #[error("Invalid SQL identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Result set for query '{0}' has no repo_id column")]
    MissingRepoIdColumn(String),

    #[error("Fill job not found: {0}")]
    JobNotFound(Uuid),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
