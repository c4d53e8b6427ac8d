//! Keyed cache of in-flight and resolved backend queries.
//!
//! Each [`QueryCache`] holds one value type. Entries are addressed by a
//! [`QueryKey`]; concurrent fetches of a pending key join the same shared
//! future so the backend sees a single request.

use crate::error::RequestError;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Composite identifier of a query: a name plus ordered parameter values
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    name: &'static str,
    params: Vec<String>,
}

impl QueryKey {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            params: Vec::new(),
        }
    }

    /// Append a parameter value to the key
    pub fn with_param(mut self, param: impl ToString) -> Self {
        self.params.push(param.to_string());
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.name)?;
        for param in &self.params {
            write!(f, ", {}", param)?;
        }
        write!(f, "]")
    }
}

/// Lifecycle of a query key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// A required parameter is missing; nothing will be fetched
    Disabled,
    /// Never fetched
    Idle,
    /// First fetch in flight, no data yet
    Pending,
    Success,
    Error,
}

/// Snapshot of a query as consumers observe it
#[derive(Debug)]
pub struct QueryState<T> {
    pub status: QueryStatus,
    /// Last successfully fetched value, kept across refetches and errors
    pub data: Option<Arc<T>>,
    pub error: Option<RequestError>,
    /// A request for this key is in flight
    pub is_fetching: bool,
    /// Data is older than the cache's stale time or was invalidated
    pub is_stale: bool,
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            is_fetching: self.is_fetching,
            is_stale: self.is_stale,
        }
    }
}

impl<T> QueryState<T> {
    /// State of a query whose key cannot be built yet
    pub fn disabled() -> Self {
        Self {
            status: QueryStatus::Disabled,
            data: None,
            error: None,
            is_fetching: false,
            is_stale: false,
        }
    }

    fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            ..Self::disabled()
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == QueryStatus::Pending
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_disabled(&self) -> bool {
        self.status == QueryStatus::Disabled
    }
}

/// How long resolved entries may be served without refetching
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CachePolicy {
    /// `None` keeps entries fresh for the lifetime of the cache
    pub stale_time: Option<Duration>,
}

type SharedFetch<T> = Shared<BoxFuture<'static, Result<Arc<T>, RequestError>>>;

struct InFlight<T> {
    fetch: SharedFetch<T>,
    generation: u64,
}

struct Entry<T> {
    data: Option<Arc<T>>,
    error: Option<RequestError>,
    fetched_at: Option<Instant>,
    invalidated: bool,
    in_flight: Option<InFlight<T>>,
}

impl<T> Default for Entry<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            fetched_at: None,
            invalidated: false,
            in_flight: None,
        }
    }
}

impl<T> Entry<T> {
    fn is_stale(&self, policy: CachePolicy) -> bool {
        if self.invalidated {
            return true;
        }
        match (self.fetched_at, policy.stale_time) {
            (Some(at), Some(stale_time)) => at.elapsed() >= stale_time,
            _ => false,
        }
    }

    fn state(&self, policy: CachePolicy) -> QueryState<T> {
        let status = if self.error.is_some() {
            QueryStatus::Error
        } else if self.data.is_some() {
            QueryStatus::Success
        } else if self.in_flight.is_some() {
            QueryStatus::Pending
        } else {
            QueryStatus::Idle
        };

        QueryState {
            status,
            data: self.data.clone(),
            error: self.error.clone(),
            is_fetching: self.in_flight.is_some(),
            is_stale: self.data.is_some() && self.is_stale(policy),
        }
    }
}

/// Per-key cache for one query value type
pub struct QueryCache<T> {
    entries: Mutex<HashMap<QueryKey, Entry<T>>>,
    policy: CachePolicy,
    version: watch::Sender<u64>,
    // Never reset, so a request dropped by `remove`/`clear` cannot match a later one.
    generation: AtomicU64,
}

impl<T> Default for QueryCache<T>
where
    T: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(CachePolicy::default())
    }
}

impl<T> QueryCache<T>
where
    T: Send + Sync + 'static,
{
    pub fn new(policy: CachePolicy) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            entries: Mutex::new(HashMap::new()),
            policy,
            version,
            generation: AtomicU64::new(0),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry<T>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn notify(&self) {
        self.version.send_modify(|v| *v += 1);
    }

    /// Receive a new version number every time any entry changes
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    /// Current state for `key` without triggering a fetch
    pub fn state(&self, key: &QueryKey) -> QueryState<T> {
        self.entries()
            .get(key)
            .map(|entry| entry.state(self.policy))
            .unwrap_or_else(QueryState::idle)
    }

    /// Resolve `key`, issuing at most one request for it at a time.
    ///
    /// Fresh data is returned without calling `fetcher`. A pending key is
    /// joined. Anything else (idle, error, stale) starts a new request.
    pub async fn fetch<F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<Arc<T>, RequestError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, RequestError>> + Send + 'static,
    {
        let (fetch, generation) = {
            let mut entries = self.entries();
            let entry = entries.entry(key.clone()).or_default();

            if let Some(in_flight) = &entry.in_flight {
                debug!(key = %key, "joining in-flight request");
                (in_flight.fetch.clone(), in_flight.generation)
            } else {
                let fresh = entry.error.is_none() && !entry.is_stale(self.policy);
                if let (Some(data), true) = (&entry.data, fresh) {
                    debug!(key = %key, "cache hit");
                    return Ok(Arc::clone(data));
                }

                debug!(key = %key, "starting request");
                let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
                let fetch = fetcher().map(|result| result.map(Arc::new)).boxed().shared();
                entry.in_flight = Some(InFlight {
                    fetch: fetch.clone(),
                    generation,
                });
                (fetch, generation)
            }
        };
        self.notify();

        let result = fetch.await;
        self.settle(key, generation, &result);
        result
    }

    /// Record the outcome of a request once; later joiners find it already settled.
    fn settle(&self, key: &QueryKey, generation: u64, result: &Result<Arc<T>, RequestError>) {
        {
            let mut entries = self.entries();
            let Some(entry) = entries.get_mut(key) else {
                return;
            };
            if entry.in_flight.as_ref().map(|f| f.generation) != Some(generation) {
                return;
            }

            entry.in_flight = None;
            match result {
                Ok(data) => {
                    entry.data = Some(Arc::clone(data));
                    entry.error = None;
                    entry.fetched_at = Some(Instant::now());
                    entry.invalidated = false;
                }
                Err(err) => {
                    warn!(key = %key, error = %err, "query failed");
                    entry.error = Some(err.clone());
                }
            }
        }
        self.notify();
    }

    /// Mark `key` stale so the next fetch goes to the backend
    pub fn invalidate(&self, key: &QueryKey) {
        if let Some(entry) = self.entries().get_mut(key) {
            entry.invalidated = true;
        }
        self.notify();
    }

    /// Drop the entry for `key`; an in-flight request for it will not be recorded
    pub fn remove(&self, key: &QueryKey) {
        self.entries().remove(key);
        self.notify();
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries().clear();
        self.notify();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
