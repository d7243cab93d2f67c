//! Response classification.
//!
//! Maps a status code, response headers and decoded body onto the action the
//! dispatcher should take next.

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde_json::Value as JsonValue;
use sluice_error::{DispatchErrorKind, RateLimitScope, SERVER_ERROR_MESSAGE};
use std::time::Duration;

/// Header whose presence marks a 429 as a global rate limit.
pub const GLOBAL_HEADER: &str = "x-ratelimit-global";

/// Statuses that are never retried.
pub const CLIENT_ERROR_STATUSES: [u16; 4] = [300, 401, 403, 404];

/// What a single response means for the call that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The call succeeded; the body goes back to the caller
    Success(JsonValue),
    /// The bucket is rate limited; retry after the delay
    RetryLocal(Duration),
    /// Every bucket is rate limited; close the gate for the delay
    RetryGlobal(Duration),
    /// Terminal client status
    ClientError {
        /// HTTP status code
        status: u16,
        /// Decoded response body
        body: JsonValue,
    },
    /// Upstream fault
    ServerError {
        /// HTTP status code
        status: u16,
        /// Decoded response body
        body: JsonValue,
    },
    /// Status outside the HTTP range
    Unknown {
        /// Status as received
        status: u16,
    },
}

impl Outcome {
    /// Whether the dispatcher should stop trying immediately.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Outcome::Success(_) | Outcome::ClientError { .. })
    }

    /// The body on success, or the failure this outcome represents if it is
    /// the last one observed.
    pub fn into_result(self) -> Result<JsonValue, DispatchErrorKind> {
        let kind = match self {
            Outcome::Success(body) => return Ok(body),
            Outcome::RetryLocal(retry_after) => DispatchErrorKind::RateLimited {
                scope: RateLimitScope::Local,
                retry_after,
            },
            Outcome::RetryGlobal(retry_after) => DispatchErrorKind::RateLimited {
                scope: RateLimitScope::Global,
                retry_after,
            },
            Outcome::ClientError { status, body } => DispatchErrorKind::ClientError {
                status,
                message: body_message(&body)
                    .or_else(|| canonical_reason(status))
                    .unwrap_or_default(),
            },
            Outcome::ServerError { status, body } => DispatchErrorKind::ServerError {
                status,
                message: body_message(&body).unwrap_or_else(|| SERVER_ERROR_MESSAGE.to_string()),
            },
            Outcome::Unknown { status } => DispatchErrorKind::Unknown { status },
        };
        Err(kind)
    }

    /// The failure this outcome represents, or `None` for [`Outcome::Success`].
    pub fn into_error_kind(self) -> Option<DispatchErrorKind> {
        self.into_result().err()
    }
}

/// Human-readable `message` field of an error body.
fn body_message(body: &JsonValue) -> Option<String> {
    body.get("message")
        .and_then(JsonValue::as_str)
        .map(str::to_string)
}

fn canonical_reason(status: u16) -> Option<String> {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map(str::to_string)
}

/// Response classifier.
///
/// Classification is a pure function of its inputs and the classifier's
/// settings.
///
/// # Example
///
/// ```
/// use reqwest::header::HeaderMap;
/// use serde_json::json;
/// use sluice_rate_limit::{Classifier, Outcome};
/// use std::time::Duration;
///
/// let classifier = Classifier::default();
/// let outcome = classifier.classify(429, &HeaderMap::new(), &json!({ "retry_after": 0.5 }));
/// assert_eq!(outcome, Outcome::RetryLocal(Duration::from_millis(500)));
/// ```
#[derive(Debug, Clone, PartialEq, derive_getters::Getters)]
pub struct Classifier {
    /// Delay used when a 429 body carries no usable `retry_after`.
    default_retry_after: Duration,
    /// Upper bound on any server-requested delay.
    max_retry_after: Duration,
    /// Treat every 4xx other than 429 as a client error.
    strict_client_errors: bool,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            default_retry_after: Duration::from_secs(1),
            max_retry_after: Duration::from_secs(3600),
            strict_client_errors: false,
        }
    }
}

impl Classifier {
    /// Create a classifier with explicit settings.
    pub fn new(
        default_retry_after: Duration,
        max_retry_after: Duration,
        strict_client_errors: bool,
    ) -> Self {
        Self {
            default_retry_after,
            max_retry_after,
            strict_client_errors,
        }
    }

    /// Classify one response.
    pub fn classify(&self, status: u16, headers: &HeaderMap, body: &JsonValue) -> Outcome {
        if CLIENT_ERROR_STATUSES.contains(&status) {
            return Outcome::ClientError {
                status,
                body: body.clone(),
            };
        }

        if status == 429 {
            let delay = self.retry_after(body);
            return if is_global(headers, body) {
                Outcome::RetryGlobal(delay)
            } else {
                Outcome::RetryLocal(delay)
            };
        }

        if !(100..=599).contains(&status) {
            return Outcome::Unknown { status };
        }

        if status >= 500 {
            return Outcome::ServerError {
                status,
                body: body.clone(),
            };
        }

        if self.strict_client_errors && (400..500).contains(&status) {
            return Outcome::ClientError {
                status,
                body: body.clone(),
            };
        }

        Outcome::Success(body.clone())
    }

    /// Server-requested delay from a 429 body, clamped to the configured range.
    fn retry_after(&self, body: &JsonValue) -> Duration {
        let seconds = match body.get("retry_after") {
            Some(JsonValue::Number(n)) => n.as_f64(),
            Some(JsonValue::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };

        match seconds {
            Some(secs) if secs.is_finite() && secs >= 0.0 => Duration::try_from_secs_f64(secs)
                .map_or(self.max_retry_after, |delay| delay.min(self.max_retry_after)),
            _ => self.default_retry_after.min(self.max_retry_after),
        }
    }
}

/// Whether a 429 names the global limit, by header or body flag.
fn is_global(headers: &HeaderMap, body: &JsonValue) -> bool {
    headers.contains_key(GLOBAL_HEADER)
        || body
            .get("global")
            .and_then(JsonValue::as_bool)
            .unwrap_or(false)
}
