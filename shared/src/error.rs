//! Client error taxonomy
//!
//! Every surfaced error carries a kind plus a human-readable detail so a
//! presentation layer can render a specific message without inspecting
//! transport internals. Variants hold owned strings and are cloneable,
//! which lets a cache entry in error state be observed by any number of
//! subscribers.

use thiserror::Error;

/// Unified error type for the data layer
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// Network or timeout failure; no definitive outcome is known
    #[error("transport error: {0}")]
    Transport(String),

    /// Well-formed response that violates the expected contract
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Rejected credentials
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Authenticated but not permitted
    #[error("permission denied: {0}")]
    Authorization(String),

    /// Malformed or out-of-range input
    #[error("validation error: {0}")]
    Validation(String),

    /// State changed concurrently (resource taken or already exists)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Resource does not exist
    #[error("not found: {0}")]
    NotFound(String),
}

/// Discriminant of a [`ClientError`], for matching without the detail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Protocol,
    Authentication,
    Authorization,
    Validation,
    Conflict,
    NotFound,
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::Authorization(_) => ErrorKind::Authorization,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::NotFound(_) => ErrorKind::NotFound,
        }
    }

    /// Detail string carried by the error
    pub fn detail(&self) -> &str {
        match self {
            Self::Transport(d)
            | Self::Protocol(d)
            | Self::Authentication(d)
            | Self::Authorization(d)
            | Self::Validation(d)
            | Self::Conflict(d)
            | Self::NotFound(d) => d,
        }
    }
}

/// Result type for data-layer operations
pub type ClientResult<T> = Result<T, ClientError>;
