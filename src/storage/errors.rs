//! Storage-specific error types for pure data operations.
//!
//! These errors describe persistence failures only. They carry no registry
//! semantics; the registry service converts them to `server_error`.

use std::fmt;

/// Errors that can occur during storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// A batch operation addressed a key that does not exist.
    KeyNotFound { key: String },

    /// Data that cannot be stored or decoded.
    InvalidData {
        message: String,
        cause: Option<String>,
    },

    /// Serialization or deserialization error.
    Serialization {
        message: String,
        data_type: Option<String>,
    },

    /// Generic internal storage error.
    Internal {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::KeyNotFound { key } => write!(f, "Key not found: {}", key),
            StorageError::InvalidData { message, cause } => {
                write!(f, "Invalid data: {}", message)?;
                if let Some(cause) = cause {
                    write!(f, " (cause: {})", cause)?;
                }
                Ok(())
            }
            StorageError::Serialization { message, data_type } => {
                write!(f, "Serialization error: {}", message)?;
                if let Some(data_type) = data_type {
                    write!(f, " (type: {})", data_type)?;
                }
                Ok(())
            }
            StorageError::Internal { message, .. } => {
                write!(f, "Internal storage error: {}", message)
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Internal {
                source: Some(source),
                ..
            } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl StorageError {
    pub fn key_not_found(key: impl Into<String>) -> Self {
        Self::KeyNotFound { key: key.into() }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
            cause: None,
        }
    }

    pub fn invalid_data_with_cause(message: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
            data_type: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Whether the error concerns a missing key.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::KeyNotFound { .. })
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(error: serde_json::Error) -> Self {
        StorageError::Serialization {
            message: error.to_string(),
            data_type: Some("JSON".to_string()),
        }
    }
}
