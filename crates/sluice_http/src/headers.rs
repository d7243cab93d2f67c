//! Standing request headers and per-request header merging.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use sluice_core::RequestDescriptor;
use sluice_error::{DispatchError, DispatchErrorKind};

/// Library identification sent as the `User-Agent` unless overridden.
pub const DEFAULT_USER_AGENT: &str = concat!(
    "SluiceBot (",
    env!("CARGO_PKG_REPOSITORY"),
    ", ",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// Header carrying the percent-encoded audit-log reason.
pub const AUDIT_LOG_REASON: &str = "x-audit-log-reason";

/// Header asking for millisecond precision in rate-limit headers.
pub const RATE_LIMIT_PRECISION: &str = "x-ratelimit-precision";

/// Bytes left unescaped in an audit-log reason.
const REASON_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/')
    .remove(b' ');

/// Percent-encode an audit-log reason for transmission.
///
/// # Example
///
/// ```
/// use sluice_http::encode_reason;
///
/// assert_eq!(encode_reason("spam, again"), "spam%2C again");
/// assert_eq!(encode_reason("räumen"), "r%C3%A4umen");
/// ```
pub fn encode_reason(reason: &str) -> String {
    utf8_percent_encode(reason, REASON_SAFE).to_string()
}

/// Headers sent with every request.
///
/// The authorization value is marked sensitive so it never shows up in
/// `Debug` output.
pub(crate) fn standing_headers(token: &str, user_agent: &str) -> Result<HeaderMap, DispatchError> {
    let mut authorization = HeaderValue::from_str(&format!("Bot {}", token)).map_err(|_| {
        DispatchError::new(DispatchErrorKind::InvalidRequest(
            "token is not a valid header value".to_string(),
        ))
    })?;
    authorization.set_sensitive(true);

    let user_agent = HeaderValue::from_str(user_agent).map_err(|e| {
        DispatchError::new(DispatchErrorKind::InvalidRequest(format!(
            "user agent is not a valid header value: {}",
            e
        )))
    })?;

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, authorization);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, user_agent);
    headers.insert(RATE_LIMIT_PRECISION, HeaderValue::from_static("millisecond"));
    Ok(headers)
}

/// Standing headers plus the descriptor's reason and extra headers.
///
/// Extra headers replace standing ones with the same name.
pub(crate) fn request_headers(
    standing: &HeaderMap,
    descriptor: &RequestDescriptor,
) -> Result<HeaderMap, DispatchError> {
    let mut headers = standing.clone();

    if let Some(reason) = descriptor.reason() {
        headers.insert(AUDIT_LOG_REASON, header_value(&encode_reason(reason))?);
    }

    for (name, value) in descriptor.headers() {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            DispatchError::new(DispatchErrorKind::InvalidRequest(format!(
                "invalid header name: {}",
                name
            )))
        })?;
        headers.insert(name, header_value(value)?);
    }

    Ok(headers)
}

fn header_value(value: &str) -> Result<HeaderValue, DispatchError> {
    HeaderValue::from_str(value).map_err(|_| {
        DispatchError::new(DispatchErrorKind::InvalidRequest(format!(
            "invalid header value: {:?}",
            value
        )))
    })
}
