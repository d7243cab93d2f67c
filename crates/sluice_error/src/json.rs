//! Request and response bodies that are not the JSON expected.

/// A body could not be encoded, or a decoded body did not fit the caller's type.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Body error: {} ({}:{})", message, file, line)]
pub struct JsonError {
    /// Parser or mapping detail
    pub message: String,
    /// Line that raised it
    pub line: u32,
    /// File that raised it
    pub file: &'static str,
}

impl JsonError {
    /// Records a body error at the caller's location.
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
