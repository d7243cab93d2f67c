//! The `request` command.

use super::commands::RequestArgs;
use sluice::{ConfigError, DispatchConfig, Dispatcher, JsonError, SluiceError, SluiceResult};
use std::time::Duration;
use tracing::{info, instrument};

/// Environment variable holding the bot token.
const TOKEN_VAR: &str = "DISCORD_TOKEN";

/// Dispatch one request and print its response.
#[instrument(skip_all, fields(method = %args.method, template = %args.template))]
pub async fn send_request(config: DispatchConfig, args: RequestArgs) -> SluiceResult<()> {
    let token = std::env::var(TOKEN_VAR).map_err(|_| {
        SluiceError::from(ConfigError::new(format!("{} is not set", TOKEN_VAR)))
    })?;
    let dispatcher = Dispatcher::new(&token, config)?;

    let mut builder = dispatcher.descriptor(args.method, args.template);
    for (name, value) in &args.params {
        builder.param(name.as_str(), value);
    }
    for (name, value) in &args.query {
        builder.query(name.as_str(), value);
    }
    for (name, value) in &args.headers {
        builder.header(name.as_str(), value.as_str());
    }
    if let Some(body) = &args.body {
        let body: serde_json::Value = serde_json::from_str(body).map_err(|e| {
            SluiceError::from(JsonError::new(format!("Request body is not JSON: {}", e)))
        })?;
        builder.body(body);
    }
    if let Some(reason) = args.reason {
        builder.reason(reason);
    }
    if let Some(secs) = args.timeout {
        let timeout = Duration::try_from_secs_f64(secs).map_err(|e| {
            SluiceError::from(ConfigError::new(format!("Invalid timeout {}: {}", secs, e)))
        })?;
        builder.timeout(timeout);
    }
    let descriptor = builder.build()?;

    let response = dispatcher.request(descriptor).await?;
    info!("Request completed");

    let rendered = serde_json::to_string_pretty(&response)
        .map_err(|e| SluiceError::from(JsonError::new(e.to_string())))?;
    println!("{}", rendered);

    dispatcher.close().await;
    Ok(())
}
