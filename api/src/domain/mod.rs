// Domain layer - business rules with no HTTP concerns.
// Handlers authenticate the caller, then call into these modules.

pub mod curators;
pub mod permissions;
pub mod profiles;
pub mod reviews;
pub mod sync;
pub mod venues;

use crate::db::DatabaseError;

// Domain error type - no HTTP concerns
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for DomainError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => DomainError::NotFound("Resource not found".to_string()),
            _ => DomainError::Database(e.to_string()),
        }
    }
}

impl From<DatabaseError> for DomainError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound(msg) => DomainError::NotFound(msg),
            DatabaseError::SerializationError(e) => DomainError::Internal(e.to_string()),
            other if other.is_integrity_error() => DomainError::Conflict(other.to_string()),
            other => DomainError::Database(other.to_string()),
        }
    }
}

// Re-export commonly used functions
pub use permissions::resolve_permissions;
pub use sync::{get_sync_status, run_event_processing_job, trigger_manual_sync};
