//! Error types for feature storage.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::feature::FeatureId;

/// Which unique key a write collided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    FriendlyId,
    Name,
}

impl UniqueField {
    /// Field name as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            UniqueField::FriendlyId => "friendlyId",
            UniqueField::Name => "name",
        }
    }
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store-level errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No feature with this id.
    #[error("feature not found: {0}")]
    NotFound(FeatureId),

    /// Another feature already holds this friendly id or name.
    #[error("a feature with {field} '{value}' already exists")]
    DuplicateKey { field: UniqueField, value: String },

    /// Update was given a feature without an id.
    #[error("the given feature does not have an id set on it")]
    MissingId,

    /// Fault in the underlying storage engine.
    #[error("storage fault: {message}")]
    Storage { message: String, transient: bool },

    /// A stored record could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn duplicate(field: UniqueField, value: impl ToString) -> Self {
        StoreError::DuplicateKey {
            field,
            value: value.to_string(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        StoreError::Storage {
            message: message.into(),
            transient: false,
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        StoreError::Storage {
            message: message.into(),
            transient: true,
        }
    }

    /// Whether retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Storage { transient: true, .. })
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::NotFound(_) => "not_found",
            StoreError::DuplicateKey { .. } => "duplicate_key",
            StoreError::MissingId => "missing_id",
            StoreError::Storage { transient: true, .. } => "transient",
            StoreError::Storage { transient: false, .. } => "storage",
            StoreError::Corrupt(_) => "corrupt",
        }
    }
}

impl From<sled::Error> for StoreError {
    fn from(e: sled::Error) -> Self {
        let transient = match &e {
            sled::Error::Io(io_err) => matches!(
                io_err.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ),
            _ => false,
        };
        StoreError::Storage {
            message: e.to_string(),
            transient,
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Corrupt(e.to_string())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
