//! Global throttle gate.
//!
//! A global rate limit from the server applies to every bucket at once. While
//! the gate is closed, no caller gets past [`GlobalGate::wait_open`]; the moment
//! it reopens, every waiter resumes together.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

/// Shared open/closed gate in front of all buckets.
///
/// The gate counts closures: each [`close`](GlobalGate::close) must be paired
/// with one [`open`](GlobalGate::open), and the gate is open only when every
/// closer has reopened it. With a single closer this is a plain binary gate;
/// with overlapping global limits the gate stays shut until the longest one
/// has elapsed.
///
/// # Example
///
/// ```
/// use sluice_rate_limit::GlobalGate;
///
/// # #[tokio::main]
/// # async fn main() {
/// let gate = GlobalGate::new();
/// assert!(gate.is_open());
///
/// gate.close();
/// assert!(!gate.is_open());
/// gate.open();
///
/// // Returns immediately: the gate is open again.
/// gate.wait_open().await;
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GlobalGate {
    closers: Arc<watch::Sender<usize>>,
}

impl GlobalGate {
    /// Create an open gate.
    pub fn new() -> Self {
        let (closers, _) = watch::channel(0);
        Self {
            closers: Arc::new(closers),
        }
    }

    /// Whether callers may currently pass.
    pub fn is_open(&self) -> bool {
        *self.closers.borrow() == 0
    }

    /// Close the gate for every current and future waiter.
    pub fn close(&self) {
        self.closers.send_modify(|closers| *closers += 1);
        debug!("Global gate closed");
    }

    /// Undo one [`close`](GlobalGate::close).
    pub fn open(&self) {
        self.closers
            .send_modify(|closers| *closers = closers.saturating_sub(1));
        if self.is_open() {
            debug!("Global gate opened");
        }
    }

    /// Suspend until the gate is open.
    pub async fn wait_open(&self) {
        if self.is_open() {
            return;
        }
        warn!("Global lock is still locked, waiting for it to clear...");
        let mut rx = self.closers.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|closers| *closers == 0).await;
    }

    /// Close the gate until the returned hold is dropped.
    pub fn hold(&self) -> GateHold {
        self.close();
        GateHold { gate: self.clone() }
    }

    /// Keep the gate closed for `delay`, then reopen it.
    ///
    /// The gate reopens even if this future is dropped before the delay ends.
    #[instrument(skip(self))]
    pub async fn close_for(&self, delay: Duration) {
        let _hold = self.hold();
        tokio::time::sleep(delay).await;
    }
}

impl Default for GlobalGate {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII closure of a [`GlobalGate`].
#[derive(Debug)]
pub struct GateHold {
    gate: GlobalGate,
}

impl Drop for GateHold {
    fn drop(&mut self) {
        self.gate.open();
    }
}
