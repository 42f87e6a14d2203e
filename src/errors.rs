//! Unified error type for the recipe backend.
//!
//! Domain failures are explicit variants so the HTTP layer can map each one to a
//! status code. Storage failures are wrapped as [`Error::Database`], except unique
//! constraint violations raised by racing inserts, which callers remap to
//! [`Error::Conflict`] through [`Error::conflict_on_unique`].

use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// All errors produced by the crate
#[derive(Debug, Error)]
pub enum Error {
    /// Input failed validation (missing tags, non-positive amount, ...)
    #[error("Validation error: {message}")]
    Validation {
        /// Human readable reason
        message: String,
    },

    /// The actor is authenticated but may not modify the target
    #[error("Permission denied: {message}")]
    PermissionDenied {
        /// Human readable reason
        message: String,
    },

    /// The operation would duplicate a unique relation
    #[error("Conflict: {message}")]
    Conflict {
        /// Human readable reason
        message: String,
    },

    /// A referenced row or relation does not exist
    #[error("Not found: {message}")]
    NotFound {
        /// Human readable reason
        message: String,
    },

    /// The action requires an authenticated user
    #[error("Authentication required: {message}")]
    Unauthenticated {
        /// Human readable reason
        message: String,
    },

    /// Configuration could not be loaded
    #[error("Configuration error: {message}")]
    Config {
        /// Human readable reason
        message: String,
    },

    /// Password hashing failed
    #[error("Password hashing error: {message}")]
    PasswordHash {
        /// Human readable reason
        message: String,
    },

    /// Database error from `SeaORM`
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// I/O error (binding the listener, reading files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::PermissionDenied`].
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Maps a unique constraint violation to [`Error::Conflict`] with the given
    /// message, any other database error passes through unchanged.
    ///
    /// A check-then-insert can lose a race against a concurrent request; the loser
    /// sees the constraint violation and must report the same outcome as the
    /// pre-check would have.
    pub fn conflict_on_unique(err: DbErr, message: impl Into<String>) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Self::conflict(message),
            _ => Self::Database(err),
        }
    }
}

impl From<argon2::password_hash::Error> for Error {
    fn from(value: argon2::password_hash::Error) -> Self {
        Self::PasswordHash {
            message: value.to_string(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
