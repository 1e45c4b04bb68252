//! Error types and Result alias for the reconciler

use crate::models::{RuleKind, Value};
use std::fmt;
use thiserror::Error;

/// Main error type for the reconciler
#[derive(Error, Debug)]
pub enum Error {
    /// The UI never reached the expected state within the allotted wait
    #[error("Element not found: {locator} (waited {timeout_ms}ms)")]
    ElementNotFound { locator: String, timeout_ms: u64 },

    /// Comparator found expected != observed
    #[error("{0}")]
    Mismatch(Box<Mismatch>),

    #[error("Field name mismatch: expected snapshot of '{expected}', observed snapshot of '{observed}'")]
    FieldNameMismatch { expected: String, observed: String },

    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Session token expired")]
    TokenExpired,

    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Provisioning failed after {attempts} attempts: {last_error}")]
    ProvisionFailed { attempts: u32, last_error: String },

    #[error("Unknown reward kind: {0}")]
    UnknownRewardKind(String),

    #[error("Timed out after {elapsed_ms}ms waiting for {what}")]
    Timeout { what: String, elapsed_ms: u64 },

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Encryption error: {0}")]
    EncryptionError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl Error {
    /// Whether the poll driver may sample again after this error.
    ///
    /// Only "not there yet" conditions qualify; backend failures are fatal.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Mismatch(_) | Error::ElementNotFound { .. })
    }
}

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::NetworkError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidData(err.to_string())
    }
}

impl From<Mismatch> for Error {
    fn from(m: Mismatch) -> Self {
        Error::Mismatch(Box::new(m))
    }
}

/// Diagnostic payload of a failed comparison
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    pub field: String,
    pub rule: RuleKind,
    pub expected: Value,
    pub observed: Value,
    /// Extra context, e.g. "delta 4.00 != expected 5.00"
    pub detail: Option<String>,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Mismatch on '{}' ({}): expected {}, observed {}",
            self.field, self.rule, self.expected, self.observed
        )?;
        if let Some(detail) = &self.detail {
            write!(f, " [{}]", detail)?;
        }
        Ok(())
    }
}
