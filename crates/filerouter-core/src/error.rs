//! Error types for the file router.
//!
//! Every failure mode of the routing pipeline has a variant here. Errors are
//! serializable so they can be embedded in batch summaries and logs.
//!
//! Most of these never escape the batch handler: configuration failures turn
//! into an empty rule set and processing failures turn into per-object failure
//! results.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using FileRouterError as the error type.
pub type Result<T> = std::result::Result<T, FileRouterError>;

/// Top-level error type for all file router operations.
#[derive(Debug, Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum FileRouterError {
    /// Configuration errors (application config or routing rules document)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Object store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Filename filter evaluation errors
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    /// Inbound event decoding errors
    #[error("Event error: {0}")]
    Event(#[from] EventError),

    /// Internal errors that shouldn't normally occur
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors related to configuration.
///
/// Covers both the application configuration (environment and YAML) and the
/// routing rules document fetched from the object store.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {reason}")]
    LoadFailed { path: String, reason: String },

    /// Invalid configuration format
    #[error("Invalid configuration format: {reason}")]
    InvalidFormat { reason: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// The routing rules document could not be fetched
    #[error("Routing rules unavailable at {location}: {reason}")]
    RulesUnavailable { location: String, reason: String },

    /// The routing rules document could not be parsed
    #[error("Routing rules document is malformed: {reason}")]
    MalformedRules { reason: String },

    /// A single rule in the document could not be decoded
    #[error("Invalid routing rule #{index}: {reason}")]
    InvalidRule { index: usize, reason: String },
}

impl ConfigError {
    /// Creates an invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a rules unavailable error.
    pub fn rules_unavailable(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RulesUnavailable {
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// Creates a malformed rules error.
    pub fn malformed_rules(reason: impl Into<String>) -> Self {
        Self::MalformedRules {
            reason: reason.into(),
        }
    }
}

/// Errors returned by an object store backend.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum StoreError {
    /// Object does not exist
    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// Head request failed
    #[error("Failed to read metadata of {bucket}/{key}: {reason}")]
    Head {
        bucket: String,
        key: String,
        reason: String,
    },

    /// Get request failed
    #[error("Failed to read {bucket}/{key}: {reason}")]
    Get {
        bucket: String,
        key: String,
        reason: String,
    },

    /// Copy request failed
    #[error("Failed to copy {from} to {to}: {reason}")]
    Copy {
        from: String,
        to: String,
        reason: String,
    },

    /// Delete request failed
    #[error("Failed to delete {bucket}/{key}: {reason}")]
    Delete {
        bucket: String,
        key: String,
        reason: String,
    },

    /// Backend misconfiguration or transport failure
    #[error("Backend error ({backend}): {message}")]
    Backend { backend: String, message: String },
}

impl StoreError {
    /// Creates a not found error.
    pub fn not_found(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Creates a backend error.
    pub fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Returns true if a retry of the same call could succeed.
    ///
    /// The router never retries itself; backends and callers may.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Backend { .. })
    }
}

/// Errors raised while evaluating a filename filter.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum FilterError {
    /// The regex pattern of a filter does not compile
    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegex { pattern: String, reason: String },
}

/// Errors raised while decoding an inbound notification batch.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum EventError {
    /// The batch payload is not a valid notification document
    #[error("Malformed event payload: {reason}")]
    Malformed { reason: String },
}

impl From<serde_json::Error> for EventError {
    fn from(err: serde_json::Error) -> Self {
        EventError::Malformed {
            reason: err.to_string(),
        }
    }
}
