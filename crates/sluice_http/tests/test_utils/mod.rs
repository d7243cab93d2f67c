//! Test utilities for dispatcher tests.
//!
//! This module provides a scripted transport and helpers to build dispatchers
//! around it.

pub mod scripted_transport;

#[allow(unused_imports)]
pub use scripted_transport::{ScriptedTransport, SentRequest, dispatcher_with};
