//! Error types for chronovault

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for chronovault operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {reason}")]
    Configuration { reason: String },

    #[error("Storage {operation} failed for '{key}': {reason}")]
    Storage {
        operation: &'static str,
        key: String,
        reason: String,
    },

    #[error("Cryptographic operation failed for {path}: {reason}")]
    Crypto { path: PathBuf, reason: String },
}

impl Error {
    /// Shorthand for a fatal configuration error
    pub fn configuration(reason: impl Into<String>) -> Self {
        Error::Configuration {
            reason: reason.into(),
        }
    }

    /// Wrap a storage backend failure with operation and key context
    pub fn storage(operation: &'static str, key: impl Into<String>, reason: impl ToString) -> Self {
        Error::Storage {
            operation,
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for chronovault operations
pub type Result<T> = std::result::Result<T, Error>;
