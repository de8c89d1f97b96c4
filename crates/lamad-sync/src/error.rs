//! Error taxonomy shared by every Lamad client operation

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, LamadError>;

/// Client error kinds.
///
/// Collaborator failures are converted into one of these at the operation
/// boundary, so the synchronizer only ever stores a `LamadError`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LamadError {
    /// No verified identity for the request
    #[error("Not authenticated: {0}")]
    NotAuthenticated(String),

    /// Document or step not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Ownership mismatch
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Transition or action conflicts with current state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Missing or malformed required fields
    #[error("Validation error: {0}")]
    Validation(String),

    /// Loader exceeded its time budget
    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Text-generation output could not be parsed
    #[error("Upstream parse error: {0}")]
    UpstreamParse(String),

    /// Anything else
    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Discriminant of [`LamadError`], convenient for assertions and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotAuthenticated,
    NotFound,
    Forbidden,
    Conflict,
    Validation,
    Timeout,
    UpstreamParse,
    Unknown,
}

impl LamadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LamadError::NotAuthenticated(_) => ErrorKind::NotAuthenticated,
            LamadError::NotFound(_) => ErrorKind::NotFound,
            LamadError::Forbidden(_) => ErrorKind::Forbidden,
            LamadError::Conflict(_) => ErrorKind::Conflict,
            LamadError::Validation(_) => ErrorKind::Validation,
            LamadError::Timeout(_) => ErrorKind::Timeout,
            LamadError::UpstreamParse(_) => ErrorKind::UpstreamParse,
            LamadError::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Wrap an arbitrary error as `Unknown`
    pub fn unknown(err: impl fmt::Display) -> Self {
        LamadError::Unknown(err.to_string())
    }
}

impl From<serde_json::Error> for LamadError {
    fn from(err: serde_json::Error) -> Self {
        LamadError::Validation(err.to_string())
    }
}
