//! [`Transport`] backed by `reqwest`.

use crate::{PreparedRequest, Transport, TransportResponse};
use async_trait::async_trait;
use reqwest::Client;
use sluice_core::Method;
use sluice_error::HttpError;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, instrument};

/// Shared `reqwest` client that is rebuilt on first use after a close.
#[derive(Debug, Default)]
pub struct ReqwestTransport {
    client: RwLock<Option<Client>>,
    connect_timeout: Option<Duration>,
}

impl ReqwestTransport {
    /// Create a transport; the client is built lazily.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the time spent establishing a connection.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// The live client, building one if the transport is closed.
    async fn client(&self) -> Result<Client, HttpError> {
        if let Some(client) = self.client.read().await.as_ref() {
            return Ok(client.clone());
        }

        let mut slot = self.client.write().await;
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        debug!("Establishing HTTP client");
        let mut builder = Client::builder();
        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| HttpError::new(format!("Failed to build HTTP client: {}", e)))?;
        *slot = Some(client.clone());
        Ok(client)
    }
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(skip(self, request), fields(method = %request.method(), url = %request.url()))]
    async fn send(&self, request: PreparedRequest) -> Result<TransportResponse, HttpError> {
        let client = self.client().await?;

        let mut builder = client
            .request(reqwest_method(*request.method()), request.url().clone())
            .headers(request.headers().clone());
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            error!(error = ?e, "Failed to send request");
            HttpError::new(format!("Request failed: {}", e))
        })?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| {
            error!(error = ?e, "Failed to read response body");
            HttpError::new(format!("Failed to read response body: {}", e))
        })?;

        debug!(status, bytes = body.len(), "Received response");
        Ok(TransportResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }

    async fn close(&self) {
        if self.client.write().await.take().is_some() {
            debug!("HTTP client closed");
        }
    }

    async fn is_closed(&self) -> bool {
        self.client.read().await.is_none()
    }
}
