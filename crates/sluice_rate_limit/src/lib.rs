//! Rate-limit coordination for the Sluice dispatcher.
//!
//! This crate holds the shared state that keeps a client inside the upstream
//! API's limits:
//! - [`BucketLockRegistry`] serializes calls that share a bucket
//! - [`GlobalGate`] suspends every bucket during a global limit
//! - [`Classifier`] turns a response into an [`Outcome`]
//! - [`DispatchConfig`] carries the tunables

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod classifier;
mod config;
mod gate;
mod headers;
mod registry;

pub use classifier::{CLIENT_ERROR_STATUSES, Classifier, GLOBAL_HEADER, Outcome};
pub use config::DispatchConfig;
pub use gate::{GateHold, GlobalGate};
pub use headers::RateLimitHeaders;
pub use registry::{BucketGuard, BucketLockRegistry};
