//! The seam between the dispatcher and the network.

use async_trait::async_trait;
use reqwest::Url;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value as JsonValue;
use sluice_core::Method;
use sluice_error::HttpError;

/// A fully resolved request, ready to go on the wire.
#[derive(Debug, Clone, PartialEq, derive_getters::Getters)]
pub struct PreparedRequest {
    /// HTTP method
    method: Method,
    /// Absolute URL, query string included
    url: Url,
    /// Standing headers merged with the caller's
    headers: HeaderMap,
    /// JSON body
    body: Option<JsonValue>,
}

impl PreparedRequest {
    /// Assemble a request from its parts.
    pub fn new(method: Method, url: Url, headers: HeaderMap, body: Option<JsonValue>) -> Self {
        Self {
            method,
            url,
            headers,
            body,
        }
    }
}

/// Raw response as received from the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    /// Status code as received
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Undecoded body bytes
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Response with the given status and body and no headers.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Response carrying `body` serialized as JSON.
    ///
    /// # Example
    ///
    /// ```
    /// use sluice_http::TransportResponse;
    ///
    /// let response = TransportResponse::json(200, &serde_json::json!({ "id": "1" }));
    /// assert_eq!(response.body, br#"{"id":"1"}"#);
    /// ```
    pub fn json(status: u16, body: &JsonValue) -> Self {
        Self::new(status, body.to_string()).with_header("content-type", "application/json")
    }

    /// Add one header. Invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }
}

/// Sends prepared requests.
///
/// One transport is shared by every call a dispatcher makes, so
/// implementations must be safe to use concurrently.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Send one request and return the raw response.
    ///
    /// A closed transport re-establishes itself before sending.
    async fn send(&self, request: PreparedRequest) -> Result<TransportResponse, HttpError>;

    /// Release the underlying connections.
    async fn close(&self) {}

    /// Whether the transport is currently closed.
    async fn is_closed(&self) -> bool {
        false
    }
}
