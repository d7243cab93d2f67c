//! Rate-limit information carried in response headers.
//!
//! The upstream API reports bucket state on every response:
//! - `x-ratelimit-limit`: requests allowed in the current window
//! - `x-ratelimit-remaining`: requests left in the window
//! - `x-ratelimit-reset-after`: seconds until the window resets
//! - `x-ratelimit-bucket`: opaque server-side bucket id
//! - `x-ratelimit-scope`: `user`, `global` or `shared` (429 only)
//!
//! The dispatcher reacts to 429s rather than predicting them, so this snapshot
//! is informational; it is logged and exposed for callers that want it.

use reqwest::header::HeaderMap;
use tracing::debug;

/// Snapshot of the rate-limit headers of one response.
#[derive(Debug, Clone, PartialEq, Default, derive_getters::Getters)]
pub struct RateLimitHeaders {
    /// Requests allowed in the current window
    limit: Option<u32>,
    /// Requests remaining in the current window
    remaining: Option<u32>,
    /// Seconds until the window resets
    reset_after: Option<f64>,
    /// Server-side bucket id
    bucket: Option<String>,
    /// Limit scope reported on a 429
    scope: Option<String>,
    /// Whether the global marker header was present
    global: bool,
}

impl RateLimitHeaders {
    /// Parse the rate-limit headers of a response.
    ///
    /// Returns `None` when the response carries none of them.
    ///
    /// # Example
    ///
    /// ```
    /// use reqwest::header::{HeaderMap, HeaderValue};
    /// use sluice_rate_limit::RateLimitHeaders;
    ///
    /// let mut headers = HeaderMap::new();
    /// headers.insert("x-ratelimit-limit", HeaderValue::from_static("5"));
    /// headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
    /// headers.insert("x-ratelimit-reset-after", HeaderValue::from_static("1.250"));
    ///
    /// let info = RateLimitHeaders::from_headers(&headers).unwrap();
    /// assert_eq!(*info.limit(), Some(5));
    /// assert!(info.is_exhausted());
    /// ```
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let info = Self {
            limit: parse_header(headers, "x-ratelimit-limit"),
            remaining: parse_header(headers, "x-ratelimit-remaining"),
            reset_after: parse_header(headers, "x-ratelimit-reset-after"),
            bucket: header_str(headers, "x-ratelimit-bucket").map(str::to_string),
            scope: header_str(headers, "x-ratelimit-scope").map(str::to_string),
            global: headers.contains_key(crate::GLOBAL_HEADER),
        };

        if info == Self::default() {
            return None;
        }
        debug!(
            limit = ?info.limit,
            remaining = ?info.remaining,
            reset_after = ?info.reset_after,
            bucket = ?info.bucket,
            "Parsed rate limit headers"
        );
        Some(info)
    }

    /// Whether the window has no requests left.
    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }
}

fn header_str<'a>(headers: &'a HeaderMap, key: &str) -> Option<&'a str> {
    headers.get(key)?.to_str().ok()
}

fn parse_header<T: std::str::FromStr>(headers: &HeaderMap, key: &str) -> Option<T> {
    header_str(headers, key)?.trim().parse().ok()
}
