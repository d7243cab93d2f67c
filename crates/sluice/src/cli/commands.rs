//! CLI command definitions.

use clap::{Args, Parser, Subcommand};
use sluice::Method;
use std::path::PathBuf;

/// Sluice - send requests to a rate-limited API without tripping its limits
#[derive(Parser, Debug)]
#[command(name = "sluice")]
#[command(about = "Send requests to a bucketed, rate-limited API", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Read configuration from this file instead of the default locations
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dispatch one request and print the JSON response
    Request(RequestArgs),

    /// Print the rate-limit bucket a request falls in, without sending it
    Bucket {
        /// HTTP method
        method: Method,

        /// Path template, e.g. /channels/{channel_id}/messages
        template: String,

        /// Path parameter as name=value (repeatable)
        #[arg(long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,
    },

    /// Print the effective configuration as TOML
    Config,
}

/// Arguments of the `request` command
#[derive(Args, Debug)]
pub struct RequestArgs {
    /// HTTP method
    pub method: Method,

    /// Path template, e.g. /channels/{channel_id}/messages
    pub template: String,

    /// Path parameter as name=value (repeatable)
    #[arg(long = "param", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,

    /// Query parameter as name=value (repeatable)
    #[arg(long = "query", value_parser = parse_key_value)]
    pub query: Vec<(String, String)>,

    /// JSON request body
    #[arg(long)]
    pub body: Option<String>,

    /// Audit-log reason
    #[arg(long)]
    pub reason: Option<String>,

    /// Extra header as name=value (repeatable)
    #[arg(long = "header", value_parser = parse_key_value)]
    pub headers: Vec<(String, String)>,

    /// Deadline for the whole call in seconds
    #[arg(long)]
    pub timeout: Option<f64>,
}

/// Parse a `name=value` pair.
fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got {:?}", raw))?;
    if name.is_empty() {
        return Err(format!("missing name in {:?}", raw));
    }
    Ok((name.to_string(), value.to_string()))
}
