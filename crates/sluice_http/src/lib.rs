//! HTTP side of the Sluice dispatcher.
//!
//! [`Dispatcher`] is the entry point: it takes a
//! [`RequestDescriptor`](sluice_core::RequestDescriptor), coordinates with the
//! bucket locks and the global gate, sends through a [`Transport`], and
//! returns the decoded body or a classified failure.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod dispatcher;
mod headers;
mod path;
mod reqwest_transport;
mod transport;

pub use dispatcher::Dispatcher;
pub use headers::{AUDIT_LOG_REASON, DEFAULT_USER_AGENT, RATE_LIMIT_PRECISION, encode_reason};
pub use path::encode_segment;
pub use reqwest_transport::ReqwestTransport;
pub use transport::{PreparedRequest, Transport, TransportResponse};
