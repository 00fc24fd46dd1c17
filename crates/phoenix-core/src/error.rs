//! Error types for the Phoenix synchronization engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for every Phoenix crate.
///
/// The first four variants are the operator-facing taxonomy (structural,
/// not found, store, validation). The remaining variants are plumbing that
/// lower layers convert into via `From`.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum PhoenixError {
    /// Malformed or missing manifest / backup file. Not retryable.
    #[error("Structural error in '{path}': {message}")]
    Structural { path: String, message: String },

    /// Referenced world, package or blob does not exist.
    #[error("{entity_type} not found: '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Underlying persistence failure, with the original cause attached.
    #[error("Store error ({context}): {message}")]
    Store { context: String, message: String },

    /// Incoming data lacks required fields or is otherwise unusable.
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PhoenixError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Structural error for the given file or package path.
    pub fn structural(path: impl AsRef<std::path::Path>, message: impl Into<String>) -> Self {
        Self::Structural {
            path: path.as_ref().display().to_string(),
            message: message.into(),
        }
    }

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a Store error; `context` names what was being read or written.
    pub fn store(context: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Store {
            context: context.into(),
            message: cause.to_string(),
        }
    }

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Structural { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_store(&self) -> bool {
        matches!(self, Self::Store { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for PhoenixError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for PhoenixError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for PhoenixError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for PhoenixError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, PhoenixError>`.
pub type Result<T> = std::result::Result<T, PhoenixError>;
