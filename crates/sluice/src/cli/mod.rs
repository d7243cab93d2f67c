//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the sluice binary.

mod bucket;
mod commands;
mod config;
mod request;

pub use bucket::show_bucket;
pub use commands::{Cli, Commands, RequestArgs};
pub use config::{load_config, show_config};
pub use request::send_request;
