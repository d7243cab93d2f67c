//! Failures reaching the API at all.
//!
//! A response with any status, 429 and 5xx included, is not an [`HttpError`];
//! those are classified into a [`DispatchError`](crate::DispatchError). This
//! type covers the cases where no response came back: refused or reset
//! connections, TLS failures, a body that could not be read.

/// The transport could not complete an exchange with the API.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Transport failure: {} ({}:{})", message, file, line)]
pub struct HttpError {
    /// What the transport reported
    pub message: String,
    /// Line that raised it
    pub line: u32,
    /// File that raised it
    pub file: &'static str,
}

impl HttpError {
    /// Records a transport failure at the caller's location.
    ///
    /// ```
    /// use sluice_error::HttpError;
    ///
    /// let err = HttpError::new("connection reset while sending POST /channels/C1/messages");
    /// assert!(err.to_string().starts_with("Transport failure: connection reset"));
    /// assert!(err.file.ends_with(".rs"));
    /// ```
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: location.line(),
            file: location.file(),
        }
    }
}
