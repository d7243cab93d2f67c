//! Rejected dispatcher settings.

/// A dispatcher setting failed to load or validate.
///
/// Raised for unreadable or malformed `sluice.toml` layers, bad `SLUICE_*`
/// overrides, and values that pass parsing but make no sense, such as a zero
/// attempt budget or a negative retry delay.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Invalid configuration: {} ({}:{})", message, file, line)]
pub struct ConfigError {
    /// Which setting was rejected, and why
    pub message: String,
    /// Line that rejected it
    pub line: u32,
    /// File that rejected it
    pub file: &'static str,
}

impl ConfigError {
    /// Records a rejected setting at the caller's location.
    ///
    /// ```
    /// use sluice_error::ConfigError;
    ///
    /// let err = ConfigError::new("default_retry_after_secs must be non-negative");
    /// assert!(err.to_string().contains("default_retry_after_secs"));
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
