//! Sluice - rate-limit-aware request dispatcher
//!
//! Sluice sits between application code and a bucketed, globally throttled
//! HTTP API such as Discord's REST API. Every call is described once, mapped
//! onto its rate-limit bucket, and sent so that:
//!
//! - calls sharing a bucket never overlap
//! - calls in different buckets run in parallel
//! - a global limit suspends all traffic until it clears
//! - rate limits are retried after the server's delay, within a budget
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use sluice::{DispatchConfig, Dispatcher, Method, SluiceResult};
//!
//! #[tokio::main]
//! async fn main() -> SluiceResult<()> {
//!     let token = std::env::var("DISCORD_TOKEN").unwrap_or_default();
//!     let dispatcher = Dispatcher::new(&token, DispatchConfig::load()?)?;
//!
//!     let descriptor = dispatcher
//!         .descriptor(Method::Get, "/channels/{channel_id}/messages")
//!         .param("channel_id", 41771983423143937u64)
//!         .query("limit", 10)
//!         .build()?;
//!
//!     let messages = dispatcher.request(descriptor).await?;
//!     println!("{}", messages);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `sluice_error` - Error types
//! - `sluice_core` - Methods, request descriptors and bucket keys
//! - `sluice_rate_limit` - Bucket locks, the global gate, classification, configuration
//! - `sluice_http` - Transport and dispatcher
//!
//! This crate re-exports everything for convenience.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod logging;

pub use logging::{LoggingConfig, init_logging};

pub use sluice_core::{
    BucketKey, BucketPolicy, CHANNEL_ID, GUILD_ID, Method, RequestDescriptor,
    RequestDescriptorBuilder, placeholders, render, render_all,
};
pub use sluice_error::{
    BuilderError, BuilderErrorKind, ConfigError, DispatchError, DispatchErrorKind, HttpError,
    JsonError, RateLimitScope, RetryableError, SERVER_ERROR_MESSAGE, SluiceError, SluiceErrorKind,
    SluiceResult,
};
pub use sluice_http::{
    AUDIT_LOG_REASON, DEFAULT_USER_AGENT, Dispatcher, PreparedRequest, RATE_LIMIT_PRECISION,
    ReqwestTransport, Transport, TransportResponse, encode_reason,
};
pub use sluice_rate_limit::{
    BucketGuard, BucketLockRegistry, CLIENT_ERROR_STATUSES, Classifier, DispatchConfig,
    GLOBAL_HEADER, GateHold, GlobalGate, Outcome, RateLimitHeaders,
};
