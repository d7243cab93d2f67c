//! Rate-limit-aware request dispatcher.

use crate::headers::{DEFAULT_USER_AGENT, request_headers, standing_headers};
use crate::path::wire_path;
use crate::{PreparedRequest, ReqwestTransport, Transport};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use sluice_core::{BucketPolicy, Method, RequestDescriptor, RequestDescriptorBuilder};
use sluice_error::{DispatchError, DispatchErrorKind, SluiceResult};
use sluice_rate_limit::{
    BucketLockRegistry, Classifier, DispatchConfig, GlobalGate, Outcome, RateLimitHeaders,
};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Sends descriptors to the API while staying inside its rate limits.
///
/// A dispatcher is cheap to clone; clones share the transport, the bucket
/// locks and the global gate, so one dispatcher (or its clones) should serve
/// every task that talks to the same API with the same token.
///
/// Each call:
/// 1. waits for the global gate to be open
/// 2. takes its bucket's lock
/// 3. sends and classifies the response
/// 4. returns, fails, or retries within the attempt budget
///
/// # Example
///
/// ```no_run
/// use sluice_core::Method;
/// use sluice_http::Dispatcher;
/// use sluice_rate_limit::DispatchConfig;
///
/// # async fn run() -> sluice_error::SluiceResult<()> {
/// let dispatcher = Dispatcher::new("my-bot-token", DispatchConfig::default())?;
/// let descriptor = dispatcher
///     .descriptor(Method::Post, "/channels/{channel_id}/messages")
///     .param("channel_id", 41771983423143937u64)
///     .body(serde_json::json!({ "content": "hello" }))
///     .build()?;
///
/// let message = dispatcher.request(descriptor).await?;
/// println!("sent message {}", message["id"]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    registry: BucketLockRegistry,
    gate: GlobalGate,
    classifier: Classifier,
    config: Arc<DispatchConfig>,
    api_base: Arc<str>,
    headers: Arc<reqwest::header::HeaderMap>,
}

impl Dispatcher {
    /// Create a dispatcher sending through `reqwest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the token cannot be
    /// sent as a header.
    pub fn new(token: &str, config: DispatchConfig) -> SluiceResult<Self> {
        Self::with_transport(token, config, Arc::new(ReqwestTransport::new()))
    }

    /// Create a dispatcher sending through a custom transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the token cannot be
    /// sent as a header.
    #[instrument(skip_all, fields(token_len = token.len(), api_base = %config.api_base))]
    pub fn with_transport(
        token: &str,
        config: DispatchConfig,
        transport: Arc<dyn Transport>,
    ) -> SluiceResult<Self> {
        config.validate()?;

        let user_agent = config.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
        let headers = standing_headers(token, user_agent)?;
        let api_base: Arc<str> = config.api_base.trim_end_matches('/').into();

        info!(max_attempts = config.max_attempts, "Dispatcher created");
        Ok(Self {
            transport,
            registry: BucketLockRegistry::new(),
            gate: GlobalGate::new(),
            classifier: config.classifier(),
            api_base,
            headers: Arc::new(headers),
            config: Arc::new(config),
        })
    }

    /// Descriptor builder preset with this dispatcher's bucket policy.
    pub fn descriptor(
        &self,
        method: Method,
        template: impl Into<String>,
    ) -> RequestDescriptorBuilder {
        let mut builder = RequestDescriptor::builder();
        builder
            .method(method)
            .template(template)
            .policy(self.bucket_policy());
        builder
    }

    /// Bucket policy descriptors sent through this dispatcher should use.
    pub fn bucket_policy(&self) -> BucketPolicy {
        self.config.bucket_policy()
    }

    /// Active configuration.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Bucket locks shared by this dispatcher's clones.
    pub fn registry(&self) -> &BucketLockRegistry {
        &self.registry
    }

    /// Global gate shared by this dispatcher's clones.
    pub fn gate(&self) -> &GlobalGate {
        &self.gate
    }

    /// Close the transport. The next request re-establishes it.
    pub async fn close(&self) {
        self.transport.close().await;
        info!("Dispatcher transport closed");
    }

    /// Send a descriptor and return the decoded response body.
    ///
    /// Rate limits are absorbed by waiting and retrying. The call fails with
    /// a [`DispatchErrorKind`] when the server reports a client error, when
    /// the attempt budget runs out, when the transport fails, or when the
    /// deadline (the descriptor's, else the configured one) passes.
    ///
    /// # Errors
    ///
    /// See above; the failure carries the last observed status.
    #[instrument(
        skip_all,
        fields(
            method = %descriptor.method(),
            path = %descriptor.path(),
            bucket = %descriptor.bucket()
        )
    )]
    pub async fn request(&self, descriptor: RequestDescriptor) -> SluiceResult<JsonValue> {
        match (*descriptor.timeout()).or(self.config.request_timeout()) {
            Some(deadline) => tokio::time::timeout(deadline, self.dispatch(&descriptor))
                .await
                .map_err(|_| {
                    warn!(?deadline, "Request deadline passed");
                    DispatchError::new(DispatchErrorKind::Timeout(deadline))
                })?,
            None => self.dispatch(&descriptor).await,
        }
    }

    /// Like [`request`](Dispatcher::request), abandoning the call when
    /// `cancel` completes first.
    ///
    /// Abandoning releases the bucket lock and reopens a gate this call
    /// closed.
    ///
    /// # Errors
    ///
    /// Fails with [`DispatchErrorKind::Cancelled`] when cancelled, and as
    /// [`request`](Dispatcher::request) otherwise.
    pub async fn request_with_cancel<F>(
        &self,
        descriptor: RequestDescriptor,
        cancel: F,
    ) -> SluiceResult<JsonValue>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            result = self.request(descriptor) => result,
            () = cancel => {
                debug!("Request cancelled by caller");
                Err(DispatchError::new(DispatchErrorKind::Cancelled).into())
            }
        }
    }

    /// Send a descriptor and deserialize the response body into `T`.
    ///
    /// # Errors
    ///
    /// As [`request`](Dispatcher::request), plus
    /// [`DispatchErrorKind::Decode`] if the body does not match `T`.
    pub async fn request_as<T: DeserializeOwned>(
        &self,
        descriptor: RequestDescriptor,
    ) -> SluiceResult<T> {
        let body = self.request(descriptor).await?;
        serde_json::from_value(body).map_err(|e| {
            DispatchError::new(DispatchErrorKind::Decode(format!(
                "Response did not match {}: {}",
                std::any::type_name::<T>(),
                e
            )))
            .into()
        })
    }

    /// Resolve a descriptor into the request sent on every attempt.
    fn prepare(&self, descriptor: &RequestDescriptor) -> Result<PreparedRequest, DispatchError> {
        let raw = format!("{}{}", self.api_base, wire_path(descriptor));
        let mut url = Url::parse(&raw).map_err(|e| {
            DispatchError::new(DispatchErrorKind::InvalidRequest(format!(
                "{} is not a valid URL: {}",
                raw, e
            )))
        })?;
        if !descriptor.query().is_empty() {
            url.query_pairs_mut().extend_pairs(descriptor.query());
        }

        Ok(PreparedRequest::new(
            *descriptor.method(),
            url,
            request_headers(&self.headers, descriptor)?,
            descriptor.body().clone(),
        ))
    }

    /// The attempt loop.
    async fn dispatch(&self, descriptor: &RequestDescriptor) -> SluiceResult<JsonValue> {
        let request = self.prepare(descriptor)?;
        let max_attempts = self.config.max_attempts;
        let mut last_outcome = None;

        for attempt in 1..=max_attempts {
            self.gate.wait_open().await;
            let guard = self.registry.acquire(descriptor.bucket()).await;

            if guard.first_use() && self.config.count_registration_as_attempt {
                debug!(attempt, "Attempt spent registering the bucket");
                continue;
            }

            // A global limit may have closed the gate while this call queued
            // on the bucket lock.
            self.gate.wait_open().await;

            let response = self.transport.send(request.clone()).await.map_err(|e| {
                warn!(attempt, error = %e.message, "Transport failed");
                DispatchError::new(DispatchErrorKind::Transport(e.message))
            })?;

            if let Some(info) = RateLimitHeaders::from_headers(&response.headers) {
                if info.is_exhausted() {
                    debug!(reset_after = ?info.reset_after(), "Bucket exhausted for this window");
                }
            }

            let body = decode_body(&response.body);
            let outcome = self
                .classifier
                .classify(response.status, &response.headers, &body);

            match &outcome {
                Outcome::Success(_) => {
                    debug!(attempt, status = response.status, "Request succeeded");
                }
                Outcome::ClientError { status, .. } => {
                    debug!(attempt, status, "Client error, not retrying");
                }
                Outcome::RetryLocal(delay) => {
                    warn!(attempt, retry_after = ?delay, "Rate limited, retrying after delay");
                    tokio::time::sleep(*delay).await;
                }
                Outcome::RetryGlobal(delay) => {
                    warn!(attempt, retry_after = ?delay, "Global rate limit hit, closing gate");
                    self.gate.close_for(*delay).await;
                    debug!("Global rate limit has been released");
                }
                Outcome::ServerError { status, .. } => {
                    warn!(attempt, status, "Server error");
                }
                Outcome::Unknown { status } => {
                    warn!(attempt, status, "Unrecognized response status");
                }
            }

            if outcome.is_terminal() {
                return finish(outcome);
            }
            last_outcome = Some(outcome);
        }

        match last_outcome {
            Some(outcome) => {
                warn!(max_attempts, "Attempt budget exhausted");
                finish(outcome)
            }
            None => Err(DispatchError::new(DispatchErrorKind::InvalidRequest(
                "no attempt was sent within the attempt budget".to_string(),
            ))
            .into()),
        }
    }
}

fn finish(outcome: Outcome) -> SluiceResult<JsonValue> {
    outcome
        .into_result()
        .map_err(|kind| DispatchError::new(kind).into())
}

/// Decode a response body: empty is `null`, non-JSON is kept as a string.
fn decode_body(bytes: &[u8]) -> JsonValue {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return JsonValue::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| JsonValue::String(String::from_utf8_lossy(bytes).into_owned()))
}
