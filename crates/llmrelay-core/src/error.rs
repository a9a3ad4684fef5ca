//! Error taxonomy for every llmrelay operation.
//!
//! Validation failures are raised before any network access; the remaining
//! variants describe where in the dispatch pipeline a call gave up.

use thiserror::Error;

/// Statuses treated as possibly recoverable via retry or fallback.
pub const TRANSIENT_STATUSES: [u16; 3] = [408, 429, 502];

/// Whether an HTTP status is transient (timeout, rate limited, upstream unavailable).
pub fn is_transient_status(status: u16) -> bool {
    TRANSIENT_STATUSES.contains(&status)
}

#[derive(Debug, Error)]
pub enum RelayError {
    /// Mode-exclusivity violation in a request or audio source.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Connection, cancellation or deadline failure before a status was obtained.
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-200 status that was not retried.
    #[error("API returned status code {status} with error: {body}")]
    HttpStatus { status: u16, body: String },

    /// Every attempt failed. `status` is 0 when the last attempt never got a response.
    #[error("gave up after {attempts} attempts (last status {status}): {body}")]
    RetryExhausted {
        attempts: u32,
        status: u16,
        body: String,
    },

    /// The audio segmenting tool exited non-zero.
    #[error("failed to split audio: {0}")]
    Decode(String),

    /// A 200 response body did not match the expected shape.
    #[error("failed to parse response: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    pub fn validation(msg: impl Into<String>) -> Self {
        RelayError::Validation(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        RelayError::Transport(msg.into())
    }

    /// The HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            RelayError::HttpStatus { status, .. } => Some(*status),
            RelayError::RetryExhausted { status, .. } if *status != 0 => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
