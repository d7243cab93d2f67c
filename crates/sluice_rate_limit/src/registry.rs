//! Per-bucket lock registry.
//!
//! Every bucket gets one async mutex, created the first time the bucket is
//! seen and kept for the lifetime of the registry. Holding a bucket's
//! [`BucketGuard`] is what makes an attempt the only one in flight for that
//! bucket.

use sluice_core::BucketKey;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, instrument, trace};

type BucketLock = Arc<Mutex<()>>;

/// Registry of bucket locks, shared by every caller of one client.
///
/// # Example
///
/// ```
/// use sluice_core::{Method, RequestDescriptor};
/// use sluice_rate_limit::BucketLockRegistry;
///
/// # #[tokio::main]
/// # async fn main() {
/// let registry = BucketLockRegistry::new();
/// let descriptor = RequestDescriptor::new(Method::Get, "/gateway").unwrap();
///
/// let guard = registry.acquire(descriptor.bucket()).await;
/// assert!(guard.first_use());
/// drop(guard);
///
/// let again = registry.acquire(descriptor.bucket()).await;
/// assert!(!again.first_use());
/// assert_eq!(registry.len().await, 1);
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct BucketLockRegistry {
    locks: Arc<RwLock<HashMap<BucketKey, BucketLock>>>,
}

impl BucketLockRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the lock for `key`, creating it on first observation.
    ///
    /// Returns the lock and whether this call created it. Creation happens
    /// under the write lock through the entry API, so concurrent first users
    /// of a key always end up sharing one mutex.
    async fn lock_for(&self, key: &BucketKey) -> (BucketLock, bool) {
        if let Some(lock) = self.locks.read().await.get(key) {
            return (Arc::clone(lock), false);
        }

        let mut locks = self.locks.write().await;
        let mut created = false;
        let lock = locks.entry(key.clone()).or_insert_with(|| {
            created = true;
            Arc::new(Mutex::new(()))
        });
        if created {
            debug!(bucket = %key, "Registered new bucket lock");
        }
        (Arc::clone(lock), created)
    }

    /// Wait until the bucket is free and take it.
    ///
    /// The bucket is released when the returned guard is dropped, on every
    /// exit path of the holder.
    #[instrument(skip(self, key), fields(bucket = %key))]
    pub async fn acquire(&self, key: &BucketKey) -> BucketGuard {
        let (lock, first_use) = self.lock_for(key).await;
        let guard = lock.lock_owned().await;
        trace!("Acquired bucket lock");
        BucketGuard {
            key: key.clone(),
            first_use,
            _guard: guard,
        }
    }

    /// Take the bucket only if nobody holds it.
    pub async fn try_acquire(&self, key: &BucketKey) -> Option<BucketGuard> {
        let (lock, first_use) = self.lock_for(key).await;
        let guard = lock.try_lock_owned().ok()?;
        Some(BucketGuard {
            key: key.clone(),
            first_use,
            _guard: guard,
        })
    }

    /// Whether a lock exists for `key`.
    pub async fn contains(&self, key: &BucketKey) -> bool {
        self.locks.read().await.contains_key(key)
    }

    /// Number of distinct buckets observed so far.
    pub async fn len(&self) -> usize {
        self.locks.read().await.len()
    }

    /// Whether no bucket has been observed yet.
    pub async fn is_empty(&self) -> bool {
        self.locks.read().await.is_empty()
    }
}

/// RAII guard over one bucket.
///
/// Dropping the guard releases the bucket.
#[derive(Debug)]
pub struct BucketGuard {
    key: BucketKey,
    first_use: bool,
    _guard: OwnedMutexGuard<()>,
}

impl BucketGuard {
    /// The bucket this guard holds.
    pub fn key(&self) -> &BucketKey {
        &self.key
    }

    /// Whether acquiring this guard registered the bucket.
    pub fn first_use(&self) -> bool {
        self.first_use
    }
}

impl Drop for BucketGuard {
    fn drop(&mut self) {
        trace!(bucket = %self.key, "Released bucket lock");
    }
}
