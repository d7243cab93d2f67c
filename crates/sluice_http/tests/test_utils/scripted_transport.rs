//! In-memory transport that replays scripted responses.

use async_trait::async_trait;
use serde_json::json;
use sluice_error::HttpError;
use sluice_http::{Dispatcher, PreparedRequest, Transport, TransportResponse};
use sluice_rate_limit::DispatchConfig;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

type Scripted = Result<TransportResponse, String>;

/// One request observed by the transport.
#[derive(Debug, Clone)]
pub struct SentRequest {
    /// When the send started
    pub at: Instant,
    /// What was sent
    pub request: PreparedRequest,
}

/// Transport answering each URL path from its own queue of responses.
///
/// Paths without a script (or whose script has run out) get `200 {}`.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    sent: Mutex<Vec<SentRequest>>,
    latency: Mutex<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    closes: AtomicUsize,
}

impl ScriptedTransport {
    /// Create a transport with no scripts and no latency.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Time every send takes.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    /// Queue a response for `path`.
    pub fn push(&self, path: &str, response: TransportResponse) {
        self.scripts
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(Ok(response));
    }

    /// Queue the same response `times` times.
    pub fn push_n(&self, path: &str, response: TransportResponse, times: usize) {
        for _ in 0..times {
            self.push(path, response.clone());
        }
    }

    /// Queue a transport failure for `path`.
    pub fn push_failure(&self, path: &str, message: &str) {
        self.scripts
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(Err(message.to_string()));
    }

    /// Every request sent so far.
    pub fn sent(&self) -> Vec<SentRequest> {
        self.sent.lock().unwrap().clone()
    }

    /// Requests sent to `path`.
    pub fn sent_to(&self, path: &str) -> Vec<SentRequest> {
        self.sent()
            .into_iter()
            .filter(|sent| sent.request.url().path() == path)
            .collect()
    }

    /// Highest number of sends that overlapped.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Number of times the transport was closed.
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: PreparedRequest) -> Result<TransportResponse, HttpError> {
        let path = request.url().path().to_string();
        self.sent.lock().unwrap().push(SentRequest {
            at: Instant::now(),
            request,
        });

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&path)
            .and_then(VecDeque::pop_front);
        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(HttpError::new(message)),
            None => Ok(TransportResponse::json(200, &json!({}))),
        }
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Dispatcher over `transport` with the given configuration.
pub fn dispatcher_with(transport: &Arc<ScriptedTransport>, config: DispatchConfig) -> Dispatcher {
    Dispatcher::with_transport("test-token", config, transport.clone()).expect("valid dispatcher")
}
