//! Dispatch failure taxonomy and retry classification.

use std::time::Duration;

/// Message attached to server errors that carry no body message of their own.
pub const SERVER_ERROR_MESSAGE: &str = "The server had an error processing your request.";

/// Scope of a rate limit reported by the upstream API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
pub enum RateLimitScope {
    /// Limit applies to a single bucket
    #[display("local")]
    Local,
    /// Limit applies to every bucket at once
    #[display("global")]
    Global,
}

/// Specific conditions under which a dispatched request failed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum DispatchErrorKind {
    /// Non-retryable client status (unauthorized, forbidden, not found, ambiguous)
    #[display("Client error {}: {}", status, message)]
    ClientError {
        /// HTTP status code
        status: u16,
        /// Server-supplied message, or the canonical reason phrase
        message: String,
    },

    /// The attempt budget ran out while the server kept rate limiting
    #[display("Rate limited ({} scope), last retry_after {:?}", scope, retry_after)]
    RateLimited {
        /// Whether the last limit was per-bucket or global
        scope: RateLimitScope,
        /// The last delay the server asked for
        retry_after: Duration,
    },

    /// The server failed on every attempt
    #[display("Server error {}: {}", status, message)]
    ServerError {
        /// HTTP status code
        status: u16,
        /// Server-supplied message, or [`SERVER_ERROR_MESSAGE`]
        message: String,
    },

    /// Status that could not be interpreted
    #[display("Unknown response status {}", status)]
    Unknown {
        /// HTTP status code as received
        status: u16,
    },

    /// The transport failed before a response arrived
    #[display("Transport failure: {}", _0)]
    Transport(String),

    /// The response body did not match the requested type
    #[display("Failed to decode response: {}", _0)]
    Decode(String),

    /// The call did not finish within its deadline
    #[display("Request timed out after {:?}", _0)]
    Timeout(Duration),

    /// The caller abandoned the call before it finished
    #[display("Request cancelled")]
    Cancelled,

    /// The descriptor could not be turned into a request
    #[display("Invalid request: {}", _0)]
    InvalidRequest(String),
}

impl DispatchErrorKind {
    /// HTTP status associated with this failure, if one was observed.
    pub fn status(&self) -> Option<u16> {
        match self {
            DispatchErrorKind::ClientError { status, .. }
            | DispatchErrorKind::ServerError { status, .. }
            | DispatchErrorKind::Unknown { status } => Some(*status),
            DispatchErrorKind::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Check if this error type should be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DispatchErrorKind::RateLimited { .. }
                | DispatchErrorKind::ServerError { .. }
                | DispatchErrorKind::Unknown { .. }
                | DispatchErrorKind::Transport(_)
        )
    }

    /// Server-requested delay before a retry, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            DispatchErrorKind::RateLimited { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }
}

/// Dispatch error with source location tracking.
///
/// # Examples
///
/// ```
/// use sluice_error::{DispatchError, DispatchErrorKind, RetryableError};
///
/// let err = DispatchError::new(DispatchErrorKind::ClientError {
///     status: 404,
///     message: "Unknown Channel".to_string(),
/// });
/// assert!(!err.is_retryable());
/// assert_eq!(err.kind.status(), Some(404));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Dispatch Error: {} at line {} in {}", kind, line, file)]
pub struct DispatchError {
    /// The kind of error that occurred
    pub kind: DispatchErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl DispatchError {
    /// Create a new DispatchError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: DispatchErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &DispatchErrorKind {
        &self.kind
    }
}

/// Trait for errors that support retry logic.
pub trait RetryableError {
    /// Returns true if this error should trigger a retry.
    ///
    /// Rate limits, upstream 5xx and transport faults return true. Client
    /// errors (401, 403, 404, 300) return false.
    fn is_retryable(&self) -> bool;

    /// Delay the server asked for before retrying, if it named one.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl RetryableError for DispatchError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    fn retry_after(&self) -> Option<Duration> {
        self.kind.retry_after()
    }
}
