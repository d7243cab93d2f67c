//! Error types for the Sluice dispatcher.
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - Constructors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use sluice_error::{DispatchError, DispatchErrorKind, SluiceResult};
//!
//! fn fetch_channel() -> SluiceResult<String> {
//!     Err(DispatchError::new(DispatchErrorKind::Unknown { status: 999 }))?
//! }
//!
//! let err = fetch_channel().unwrap_err();
//! assert_eq!(err.dispatch_kind().and_then(|k| k.status()), Some(999));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod config;
mod dispatch;
mod error;
mod http;
mod json;

pub use builder::{BuilderError, BuilderErrorKind};
pub use config::ConfigError;
pub use dispatch::{
    DispatchError, DispatchErrorKind, RateLimitScope, RetryableError, SERVER_ERROR_MESSAGE,
};
pub use error::{SluiceError, SluiceErrorKind, SluiceResult};
pub use http::HttpError;
pub use json::JsonError;
