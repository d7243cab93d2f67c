//! Core data types for the Sluice dispatcher.
//!
//! This crate describes a request before it is sent: the method, the path
//! template and its parameters, and the rate-limit bucket the request falls in.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod bucket;
mod descriptor;
mod method;
mod template;

pub use bucket::{BucketKey, BucketPolicy};
pub use descriptor::{RequestDescriptor, RequestDescriptorBuilder};
pub use method::Method;
pub use template::{CHANNEL_ID, GUILD_ID, placeholders, render, render_all};
