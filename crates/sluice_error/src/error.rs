//! Top-level error wrapper types.

use crate::{BuilderError, ConfigError, DispatchError, DispatchErrorKind, HttpError, JsonError};

/// Every failure a Sluice operation can surface.
///
/// # Examples
///
/// ```
/// use sluice_error::{SluiceError, HttpError};
///
/// let err: SluiceError = HttpError::new("connection refused").into();
/// assert!(err.to_string().contains("Transport failure"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum SluiceErrorKind {
    /// No response came back from the API
    #[from(HttpError)]
    Http(HttpError),
    /// Body did not encode or decode
    #[from(JsonError)]
    Json(JsonError),
    /// Rejected dispatcher settings
    #[from(ConfigError)]
    Config(ConfigError),
    /// Builder error
    #[from(BuilderError)]
    Builder(BuilderError),
    /// Classified dispatch failure
    #[from(DispatchError)]
    Dispatch(DispatchError),
}

/// Sluice error with kind discrimination.
///
/// # Examples
///
/// ```
/// use sluice_error::{SluiceResult, ConfigError};
///
/// fn might_fail() -> SluiceResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// assert!(might_fail().is_err());
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Sluice Error: {}", _0)]
pub struct SluiceError(Box<SluiceErrorKind>);

impl SluiceError {
    /// Create a new error from a kind.
    pub fn new(kind: SluiceErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &SluiceErrorKind {
        &self.0
    }

    /// The dispatch classification, when this error came out of the dispatcher.
    pub fn dispatch_kind(&self) -> Option<&DispatchErrorKind> {
        match self.kind() {
            SluiceErrorKind::Dispatch(err) => Some(&err.kind),
            _ => None,
        }
    }
}

// Generic From implementation for any type that converts to SluiceErrorKind
impl<T> From<T> for SluiceError
where
    T: Into<SluiceErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Sluice operations.
pub type SluiceResult<T> = std::result::Result<T, SluiceError>;
