//! Query cache
//!
//! Keyed, stale-aware cache for read results. At most one fetch is in
//! flight per key; concurrent subscribers share it. Invalidating a
//! namespace refetches entries that still have subscribers and drops the
//! rest, and a fetch superseded by an invalidation is never applied once
//! it resolves.
//!
//! Entries hold the canonical `serde_json::Value` form of the fetched
//! data; typed access deserializes at the subscription boundary.

use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{ClientError, ClientResult};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::watch;

// =============================================================================
// Query keys
// =============================================================================

/// Structured identifier for a cached read: a namespace tag plus the
/// serialized parameters that select the data
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    namespace: String,
    segments: Vec<String>,
}

impl QueryKey {
    pub fn new<I, S>(namespace: &str, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            namespace: namespace.to_string(),
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn in_namespace(&self, namespace: &str) -> bool {
        self.namespace == namespace
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.namespace)?;
        for segment in &self.segments {
            write!(f, ":{segment}")?;
        }
        Ok(())
    }
}

// =============================================================================
// Snapshots and options
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Idle,
    Loading,
    Success,
    Error,
}

/// Observable state of one cache entry
#[derive(Debug, Clone)]
pub struct QuerySnapshot {
    pub status: QueryStatus,
    pub data: Option<Value>,
    pub error: Option<ClientError>,
    pub updated_at: Option<Instant>,
}

impl QuerySnapshot {
    fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            updated_at: None,
        }
    }

    /// Deserialize the cached value, if any
    pub fn decode<T: DeserializeOwned>(&self) -> ClientResult<Option<T>> {
        match &self.data {
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| ClientError::Protocol(format!("cached value undecodable: {e}"))),
            None => Ok(None),
        }
    }
}

/// Per-subscription options
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Overrides the cache-wide stale time when set
    pub stale_time: Option<Duration>,
    /// A disabled subscription never triggers a fetch; it backs dependent
    /// queries whose inputs are not resolved yet
    pub disabled: bool,
}

impl QueryOptions {
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            ..Self::default()
        }
    }

    pub fn stale_time(stale_time: Duration) -> Self {
        Self {
            stale_time: Some(stale_time),
            ..Self::default()
        }
    }
}

/// Canonical-value fetcher stored by the cache so invalidation can refetch
pub type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, ClientResult<Value>> + Send + Sync>;

/// Wrap a typed async fetch into a [`Fetcher`]
pub fn fetcher<T, F, Fut>(fetch: F) -> Fetcher
where
    T: Serialize,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ClientResult<T>> + Send + 'static,
{
    Arc::new(move || {
        let fut = fetch();
        Box::pin(async move {
            let value = fut.await?;
            serde_json::to_value(&value)
                .map_err(|e| ClientError::Protocol(format!("unencodable fetch result: {e}")))
        })
    })
}

// =============================================================================
// Cache internals
// =============================================================================

struct InFlight {
    id: u64,
    done: watch::Receiver<bool>,
}

struct SubscriberSlot {
    id: u64,
    tx: watch::Sender<QuerySnapshot>,
}

struct Entry {
    snapshot: QuerySnapshot,
    /// Bumped on invalidation; a fetch only applies its result when the
    /// epoch it captured at start is still current
    epoch: u64,
    inflight: Option<InFlight>,
    /// Ordered by subscription, which fixes notification order
    subscribers: Vec<SubscriberSlot>,
    /// Most recently registered enabled fetcher for this key
    refetcher: Option<Fetcher>,
}

impl Entry {
    fn new(epoch: u64) -> Self {
        Self {
            snapshot: QuerySnapshot::idle(),
            epoch,
            inflight: None,
            subscribers: Vec::new(),
            refetcher: None,
        }
    }

    fn notify_subscribers(&self) {
        for slot in &self.subscribers {
            let _ = slot.tx.send(self.snapshot.clone());
        }
    }
}

struct CacheInner {
    entries: Mutex<HashMap<QueryKey, Entry>>,
    next_subscriber: AtomicU64,
    next_fetch: AtomicU64,
    next_epoch: AtomicU64,
    default_stale_time: Duration,
}

impl CacheInner {
    /// Epochs are unique across entry lifetimes so a fetch outliving a
    /// dropped-and-recreated entry can never apply its result
    fn fresh_epoch(&self) -> u64 {
        self.next_epoch.fetch_add(1, Ordering::Relaxed)
    }

    /// Start a fetch for `key` unless one is already in flight (`force`
    /// replaces the tracked fetch, for invalidation). Must be called with
    /// the entry map locked; the fetch itself runs on a spawned task.
    fn start_fetch(
        inner: &Arc<CacheInner>,
        entries: &mut HashMap<QueryKey, Entry>,
        key: &QueryKey,
        force: bool,
    ) {
        let Some(entry) = entries.get_mut(key) else {
            return;
        };
        if !force && entry.inflight.is_some() {
            return;
        }
        let Some(fetch) = entry.refetcher.clone() else {
            // No enabled subscriber has registered a fetcher yet; the next
            // enabled subscription sees a stale entry and refetches.
            entry.snapshot.updated_at = None;
            return;
        };

        let fetch_id = inner.next_fetch.fetch_add(1, Ordering::Relaxed);
        let epoch = entry.epoch;
        let (done_tx, done_rx) = watch::channel(false);
        entry.inflight = Some(InFlight {
            id: fetch_id,
            done: done_rx,
        });
        entry.snapshot.status = QueryStatus::Loading;
        entry.notify_subscribers();
        tracing::debug!(key = %key, fetch_id, "fetch started");

        let inner = Arc::clone(inner);
        let key = key.clone();
        tokio::spawn(async move {
            let result = fetch().await;
            {
                let mut entries = inner.entries.lock().unwrap();
                if let Some(entry) = entries.get_mut(&key) {
                    if entry.inflight.as_ref().is_some_and(|f| f.id == fetch_id) {
                        entry.inflight = None;
                    }
                    if entry.epoch == epoch {
                        match result {
                            Ok(value) => {
                                entry.snapshot.status = QueryStatus::Success;
                                entry.snapshot.data = Some(value);
                                entry.snapshot.error = None;
                                entry.snapshot.updated_at = Some(Instant::now());
                            }
                            Err(err) => {
                                // Stored, not retried; the caller decides
                                // whether to refetch.
                                entry.snapshot.status = QueryStatus::Error;
                                entry.snapshot.error = Some(err);
                            }
                        }
                        entry.notify_subscribers();
                    } else {
                        tracing::debug!(key = %key, fetch_id, "suppressed superseded fetch result");
                    }
                }
            }
            let _ = done_tx.send(true);
        });
    }
}

// =============================================================================
// Public cache handle
// =============================================================================

/// Cheaply cloneable handle on the process-wide cache
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

impl QueryCache {
    pub fn new(default_stale_time: Duration) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                entries: Mutex::new(HashMap::new()),
                next_subscriber: AtomicU64::new(0),
                next_fetch: AtomicU64::new(0),
                next_epoch: AtomicU64::new(1),
                default_stale_time,
            }),
        }
    }

    /// Register interest in `key`. A fresh success entry is served without
    /// fetching; otherwise a fetch starts unless the subscription is
    /// disabled or one is already in flight (which the subscriber joins).
    pub fn subscribe(&self, key: QueryKey, fetch: Fetcher, options: QueryOptions) -> Subscription {
        let inner = &self.inner;
        let id = inner.next_subscriber.fetch_add(1, Ordering::Relaxed);
        let mut entries = inner.entries.lock().unwrap();
        let fresh_epoch = inner.fresh_epoch();
        let entry = entries
            .entry(key.clone())
            .or_insert_with(|| Entry::new(fresh_epoch));

        let (tx, rx) = watch::channel(entry.snapshot.clone());
        entry.subscribers.push(SubscriberSlot { id, tx });

        let mut needs_fetch = false;
        if !options.disabled {
            entry.refetcher = Some(fetch);
            let stale_time = options.stale_time.unwrap_or(inner.default_stale_time);
            let fresh = entry.snapshot.status == QueryStatus::Success
                && entry
                    .snapshot
                    .updated_at
                    .is_some_and(|at| at.elapsed() <= stale_time);
            needs_fetch = !fresh && entry.inflight.is_none();
        }
        if needs_fetch {
            CacheInner::start_fetch(inner, &mut entries, &key, false);
        }
        drop(entries);

        Subscription {
            inner: Arc::clone(inner),
            key,
            id,
            rx,
        }
    }

    /// Force a fetch for `key` regardless of staleness, joining an
    /// in-flight one, and wait for it to settle. Returns `None` for an
    /// unknown key.
    pub async fn refetch(&self, key: &QueryKey) -> Option<QuerySnapshot> {
        let done = {
            let inner = &self.inner;
            let mut entries = inner.entries.lock().unwrap();
            if !entries.contains_key(key) {
                return None;
            }
            CacheInner::start_fetch(inner, &mut entries, key, false);
            entries
                .get(key)
                .and_then(|e| e.inflight.as_ref().map(|f| f.done.clone()))
        };
        if let Some(mut rx) = done {
            while !*rx.borrow() {
                if rx.changed().await.is_err() {
                    break;
                }
            }
        }
        self.snapshot(key)
    }

    /// Mark every entry in `namespace` stale. Entries with subscribers
    /// refetch immediately; the rest are dropped and refetch lazily on
    /// their next subscription.
    pub fn invalidate(&self, namespace: &str) {
        let inner = &self.inner;
        let mut entries = inner.entries.lock().unwrap();
        let keys: Vec<QueryKey> = entries
            .keys()
            .filter(|k| k.in_namespace(namespace))
            .cloned()
            .collect();

        for key in &keys {
            let has_subscribers = {
                let entry = entries
                    .get_mut(key)
                    .expect("invalidated key disappeared under lock");
                entry.epoch = inner.fresh_epoch();
                entry.snapshot.updated_at = None;
                !entry.subscribers.is_empty()
            };
            if has_subscribers {
                CacheInner::start_fetch(inner, &mut entries, key, true);
            } else {
                entries.remove(key);
            }
        }
        if !keys.is_empty() {
            tracing::debug!(namespace = %namespace, entries = keys.len(), "cache namespace invalidated");
        }
    }

    /// Current state of `key`, if cached
    pub fn snapshot(&self, key: &QueryKey) -> Option<QuerySnapshot> {
        self.inner
            .entries
            .lock()
            .unwrap()
            .get(key)
            .map(|e| e.snapshot.clone())
    }
}

// =============================================================================
// Subscription handle
// =============================================================================

/// Live interest in one query key. Dropping it stops notifications but
/// does not cancel an underlying fetch: other subscribers, or a future
/// subscription, may still want the result.
pub struct Subscription {
    inner: Arc<CacheInner>,
    key: QueryKey,
    id: u64,
    rx: watch::Receiver<QuerySnapshot>,
}

impl Subscription {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Latest observed state
    pub fn snapshot(&self) -> QuerySnapshot {
        self.rx.borrow().clone()
    }

    /// Typed view of the latest data
    pub fn data<T: DeserializeOwned>(&self) -> ClientResult<Option<T>> {
        self.snapshot().decode()
    }

    /// Wait for the next state change
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Wait until the entry is no longer loading
    pub async fn settled(&mut self) -> QuerySnapshot {
        loop {
            let snapshot = self.rx.borrow().clone();
            if snapshot.status != QueryStatus::Loading {
                return snapshot;
            }
            if self.rx.changed().await.is_err() {
                return self.rx.borrow().clone();
            }
        }
    }

    /// Force a fetch for this key and wait for it to settle
    pub async fn refetch(&self) -> QuerySnapshot {
        let cache = QueryCache {
            inner: Arc::clone(&self.inner),
        };
        cache
            .refetch(&self.key)
            .await
            .unwrap_or_else(QuerySnapshot::idle)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut entries = self.inner.entries.lock().unwrap();
        if let Some(entry) = entries.get_mut(&self.key) {
            entry.subscribers.retain(|s| s.id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_display_and_namespace_matching() {
        let key = QueryKey::new("reservations", ["user", "42"]);
        assert_eq!(key.to_string(), "reservations:user:42");
        assert!(key.in_namespace("reservations"));
        assert!(!key.in_namespace("reservation"));
        assert!(!key.in_namespace("search"));
    }

    #[test]
    fn keyless_key_displays_namespace_only() {
        let key = QueryKey::new("search", Vec::<String>::new());
        assert_eq!(key.to_string(), "search");
    }

    #[test]
    fn snapshot_decode_round_trips() {
        let snapshot = QuerySnapshot {
            status: QueryStatus::Success,
            data: Some(serde_json::json!([1, 2, 3])),
            error: None,
            updated_at: Some(Instant::now()),
        };
        let decoded: Option<Vec<u32>> = snapshot.decode().unwrap();
        assert_eq!(decoded, Some(vec![1, 2, 3]));

        let idle = QuerySnapshot::idle();
        let decoded: Option<Vec<u32>> = idle.decode().unwrap();
        assert!(decoded.is_none());
    }

    #[tokio::test]
    async fn disabled_subscription_stays_idle() {
        let cache = QueryCache::new(Duration::from_secs(30));
        let key = QueryKey::new("reservation", ["unresolved"]);
        let fetch = fetcher(|| async {
            Err::<u32, _>(ClientError::Validation("input not resolved".into()))
        });

        let mut sub = cache.subscribe(key.clone(), fetch, QueryOptions::disabled());
        let snapshot = sub.settled().await;
        assert_eq!(snapshot.status, QueryStatus::Idle);
        assert!(snapshot.data.is_none());
        assert!(snapshot.error.is_none());
    }
}
