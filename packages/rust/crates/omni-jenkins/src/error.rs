//! Error types for Jenkins job-state requests.
//!
//! Follows ODF-EP: Explicit error enums with context.

use thiserror::Error;

/// Client-side errors. Every variant is fatal for a tracking run; the only
/// recoverable server answer (404 on a numbered execution) is modelled as
/// [`crate::ExecutionLookup::NotFound`] instead.
#[derive(Error, Debug)]
pub enum JenkinsError {
    /// Network-level failure (connect, TLS, timeout, body read).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Server answered with a status the caller cannot handle.
    #[error("Unexpected HTTP status {status} while {context}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
        /// What the request was trying to do.
        context: String,
    },

    /// Response body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A required response header was absent.
    #[error("Missing response header: {0}")]
    MissingHeader(&'static str),

    /// Invalid endpoint configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<reqwest::Error> for JenkinsError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Decode(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

/// Result type for Jenkins client operations.
pub type Result<T> = std::result::Result<T, JenkinsError>;
