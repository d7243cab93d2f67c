//! Sluice CLI binary.
//!
//! This binary provides command-line access to the dispatcher:
//! - Send one request through the rate-limit machinery
//! - Show which bucket a request falls in
//! - Print the effective configuration

use anyhow::Result;
use clap::Parser;
use sluice::{LoggingConfig, init_logging};

mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    use cli::{Cli, Commands, load_config, send_request, show_bucket, show_config};

    // Load environment variables from .env file
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let logging = if cli.verbose {
        LoggingConfig::new("debug")
    } else {
        LoggingConfig::default()
    };
    init_logging(&logging.with_json_logs(cli.json_logs))?;

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Request(args) => {
            send_request(config, args).await?;
        }

        Commands::Bucket {
            method,
            template,
            params,
        } => {
            show_bucket(&config, method, &template, &params)?;
        }

        Commands::Config => {
            show_config(&config)?;
        }
    }

    Ok(())
}
