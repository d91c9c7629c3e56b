//! Storage error types.
//!
//! Used by repository implementations; converted into [`ChatError`] at the service boundary.

use chat_core::ChatError;
use thiserror::Error;

/// Errors that can occur when using storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("Invalid input: {0}")]
    Invalid(String),
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StorageError::AlreadyExists(db.message().to_string())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                StorageError::NotFound(format!("referenced record: {}", db.message()))
            }
            sqlx::Error::RowNotFound => StorageError::NotFound("row".to_string()),
            _ => StorageError::Database(err.to_string()),
        }
    }
}

impl From<StorageError> for ChatError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => ChatError::NotFound(what),
            StorageError::AlreadyExists(what) => ChatError::Conflict(what),
            StorageError::Invalid(what) => ChatError::Validation(what),
            StorageError::Database(msg) | StorageError::Corrupt(msg) => ChatError::Persistence(msg),
        }
    }
}
