//! Offset/limit pagination that accumulates pages for a single current key.

use crate::error::RequestError;
use crate::query::QueryKey;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{debug, warn};

/// What a call to [`InfiniteQuery::fetch_next_page`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A new page with this many rows was appended
    Appended { rows: usize },
    /// A request was already in flight; the call waited for it instead of issuing another
    Joined,
    /// The last page was terminal; nothing was requested
    Exhausted,
    /// The key changed while the request was in flight; the page was dropped
    Discarded,
    /// No key is set; nothing was requested
    Disabled,
}

/// Result of the request shared by every caller waiting on it
#[derive(Debug, Clone)]
enum PageResult {
    Appended(usize),
    Failed(RequestError),
    Discarded,
}

type SharedPage = Shared<BoxFuture<'static, PageResult>>;

struct PagedInner<R> {
    key: Option<QueryKey>,
    pages: Vec<Vec<R>>,
    error: Option<RequestError>,
    in_flight: Option<SharedPage>,
    /// Bumped on every key change; responses from an older epoch are dropped
    epoch: u64,
}

impl<R> PagedInner<R> {
    fn has_next_page(&self, limit: usize) -> bool {
        self.pages.last().is_none_or(|page| page.len() >= limit)
    }
}

/// Snapshot of a paginated query
#[derive(Debug, Clone, PartialEq)]
pub struct PagedState<R> {
    pub key: Option<QueryKey>,
    /// All fetched rows in offset order
    pub rows: Vec<R>,
    pub pages: usize,
    /// No page has arrived yet and nothing has failed
    pub is_pending: bool,
    pub is_error: bool,
    pub error: Option<RequestError>,
    pub has_next_page: bool,
    /// A follow-up page is in flight while earlier pages are shown
    pub is_fetching_next_page: bool,
}

/// Infinite query: ordered pages for the current key, fetched one at a time
pub struct InfiniteQuery<R> {
    limit: usize,
    inner: Arc<Mutex<PagedInner<R>>>,
    version: Arc<watch::Sender<u64>>,
}

fn lock<R>(inner: &Mutex<PagedInner<R>>) -> MutexGuard<'_, PagedInner<R>> {
    inner.lock().unwrap_or_else(|e| e.into_inner())
}

impl<R> InfiniteQuery<R>
where
    R: Clone + Send + 'static,
{
    /// Create an empty query requesting `limit` rows per page
    pub fn new(limit: usize) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            limit: limit.max(1),
            inner: Arc::new(Mutex::new(PagedInner {
                key: None,
                pages: Vec::new(),
                error: None,
                in_flight: None,
                epoch: 0,
            })),
            version: Arc::new(version),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    fn notify(&self) {
        self.version.send_modify(|v| *v += 1);
    }

    /// Point the query at `key`. A different key discards every page and any
    /// in-flight response. Returns whether the key changed.
    pub fn set_key(&self, key: QueryKey) -> bool {
        {
            let mut inner = lock(&self.inner);
            if inner.key.as_ref() == Some(&key) {
                return false;
            }
            debug!(key = %key, "pagination key changed, restarting from offset 0");
            inner.key = Some(key);
            inner.pages.clear();
            inner.error = None;
            inner.in_flight = None;
            inner.epoch += 1;
        }
        self.notify();
        true
    }

    pub fn has_next_page(&self) -> bool {
        lock(&self.inner).has_next_page(self.limit)
    }

    /// Request the next page for the current key.
    ///
    /// `fetch` receives the current key, the offset and the limit. It is only
    /// called when no request is in flight and the last page was not terminal.
    pub async fn fetch_next_page<F, Fut>(&self, fetch: F) -> Result<FetchOutcome, RequestError>
    where
        F: FnOnce(&QueryKey, usize, usize) -> Fut,
        Fut: Future<Output = Result<Vec<R>, RequestError>> + Send + 'static,
    {
        let (request, joined) = {
            let mut inner = lock(&self.inner);
            let Some(key) = inner.key.clone() else {
                return Ok(FetchOutcome::Disabled);
            };

            if let Some(in_flight) = &inner.in_flight {
                debug!(key = %key, "page request already in flight");
                (in_flight.clone(), true)
            } else if !inner.has_next_page(self.limit) {
                return Ok(FetchOutcome::Exhausted);
            } else {
                let offset = inner.pages.len() * self.limit;
                debug!(key = %key, offset, limit = self.limit, "requesting page");
                let request = self.spawn_request(fetch(&key, offset, self.limit), inner.epoch);
                inner.in_flight = Some(request.clone());
                (request, false)
            }
        };
        self.notify();

        match request.await {
            PageResult::Failed(err) => Err(err),
            _ if joined => Ok(FetchOutcome::Joined),
            PageResult::Appended(rows) => Ok(FetchOutcome::Appended { rows }),
            PageResult::Discarded => Ok(FetchOutcome::Discarded),
        }
    }

    /// Wrap a page request so that whichever caller drives it to completion
    /// records the page exactly once.
    fn spawn_request<Fut>(&self, request: Fut, epoch: u64) -> SharedPage
    where
        Fut: Future<Output = Result<Vec<R>, RequestError>> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let version = Arc::clone(&self.version);

        async move {
            let result = request.await;
            let outcome = {
                let mut state = lock(&inner);
                if state.epoch != epoch {
                    debug!(epoch, current = state.epoch, "discarding page for a previous key");
                    return PageResult::Discarded;
                }
                state.in_flight = None;
                match result {
                    Ok(rows) => {
                        let count = rows.len();
                        state.pages.push(rows);
                        state.error = None;
                        PageResult::Appended(count)
                    }
                    Err(err) => {
                        warn!(error = %err, "page request failed");
                        state.error = Some(err.clone());
                        PageResult::Failed(err)
                    }
                }
            };
            version.send_modify(|v| *v += 1);
            outcome
        }
        .boxed()
        .shared()
    }

    /// Snapshot of the accumulated rows and flags
    pub fn state(&self) -> PagedState<R> {
        let inner = lock(&self.inner);
        let rows = inner.pages.iter().flatten().cloned().collect();
        let has_pages = !inner.pages.is_empty();

        PagedState {
            key: inner.key.clone(),
            rows,
            pages: inner.pages.len(),
            is_pending: inner.key.is_some() && !has_pages && inner.error.is_none(),
            is_error: inner.error.is_some(),
            error: inner.error.clone(),
            has_next_page: inner.has_next_page(self.limit),
            is_fetching_next_page: has_pages && inner.in_flight.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    /// Rows `offset..min(offset + limit, total)` of a benchmark with `total` rows
    fn rows(total: usize, offset: usize, limit: usize) -> Vec<usize> {
        (offset..total.min(offset + limit)).collect()
    }

    fn key(id: &str) -> QueryKey {
        QueryKey::new("benchmark").with_param(id)
    }

    #[tokio::test]
    async fn test_pages_accumulate_until_terminal_page() {
        let query = InfiniteQuery::new(20);
        query.set_key(key("1"));
        assert!(query.has_next_page());
        assert!(query.state().is_pending);

        let mut lengths = Vec::new();
        let mut has_next = Vec::new();
        while query.has_next_page() {
            let outcome = query
                .fetch_next_page(|_, offset, limit| async move { Ok(rows(45, offset, limit)) })
                .await
                .unwrap();
            if let FetchOutcome::Appended { rows } = outcome {
                lengths.push(rows);
            }
            has_next.push(query.has_next_page());
        }

        assert_eq!(lengths, vec![20, 20, 5]);
        assert_eq!(has_next, vec![true, true, false]);

        let state = query.state();
        assert_eq!(state.rows, (0..45).collect::<Vec<_>>());
        assert_eq!(state.pages, 3);
        assert!(!state.is_pending);
        assert!(!state.has_next_page);
    }

    #[tokio::test]
    async fn test_fetch_after_terminal_page_is_noop() {
        let query = InfiniteQuery::new(20);
        query.set_key(key("1"));
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = Arc::clone(&calls);
            query
                .fetch_next_page(move |_, offset, limit| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move { Ok(rows(5, offset, limit)) }
                })
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(query.state().rows.len(), 5);
    }

    #[tokio::test]
    async fn test_exact_multiple_needs_an_empty_terminal_page() {
        let query = InfiniteQuery::new(20);
        query.set_key(key("1"));

        for _ in 0..2 {
            query
                .fetch_next_page(|_, offset, limit| async move { Ok(rows(40, offset, limit)) })
                .await
                .unwrap();
        }
        assert!(query.has_next_page());

        let outcome = query
            .fetch_next_page(|_, offset, limit| async move { Ok(rows(40, offset, limit)) })
            .await
            .unwrap();
        assert_eq!(outcome, FetchOutcome::Appended { rows: 0 });
        assert!(!query.has_next_page());
        assert_eq!(query.state().rows.len(), 40);
    }

    #[tokio::test]
    async fn test_offsets_follow_page_count() {
        let query = InfiniteQuery::new(10);
        query.set_key(key("1"));
        let offsets = Arc::new(Mutex::new(Vec::new()));

        for _ in 0..3 {
            let offsets = Arc::clone(&offsets);
            query
                .fetch_next_page(move |_, offset, limit| {
                    offsets.lock().unwrap().push(offset);
                    async move { Ok(rows(100, offset, limit)) }
                })
                .await
                .unwrap();
        }

        assert_eq!(*offsets.lock().unwrap(), vec![0, 10, 20]);
    }

    #[tokio::test]
    async fn test_no_key_is_disabled() {
        let query: InfiniteQuery<usize> = InfiniteQuery::new(20);
        let outcome = query
            .fetch_next_page(|_, _, _| async { Ok(vec![1]) })
            .await
            .unwrap();
        assert_eq!(outcome, FetchOutcome::Disabled);
        assert!(!query.state().is_pending);
    }

    #[tokio::test]
    async fn test_concurrent_calls_issue_one_request() {
        let query = InfiniteQuery::new(20);
        query.set_key(key("1"));
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = oneshot::channel::<()>();

        let first = {
            let calls = Arc::clone(&calls);
            query.fetch_next_page(move |_, offset, limit| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    rx.await.ok();
                    Ok(rows(45, offset, limit))
                }
            })
        };
        let second = {
            let calls = Arc::clone(&calls);
            query.fetch_next_page(move |_, offset, limit| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok(rows(45, offset, limit)) }
            })
        };
        let release = async {
            tokio::task::yield_now().await;
            tx.send(()).unwrap();
        };

        let (a, b, ()) = tokio::join!(first, second, release);
        assert_eq!(a.unwrap(), FetchOutcome::Appended { rows: 20 });
        assert_eq!(b.unwrap(), FetchOutcome::Joined);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(query.state().pages, 1);
    }

    #[tokio::test]
    async fn test_key_change_discards_in_flight_page() {
        let query = InfiniteQuery::new(20);
        query.set_key(key("old"));
        let (tx, rx) = oneshot::channel::<()>();

        let stale = query.fetch_next_page(move |_, offset, limit| async move {
            rx.await.ok();
            Ok(rows(45, offset, limit))
        });
        let switch = async {
            tokio::task::yield_now().await;
            assert!(query.state().is_pending);
            assert!(query.set_key(key("new")));
            tx.send(()).unwrap();
        };

        let (outcome, ()) = tokio::join!(stale, switch);
        assert_eq!(outcome.unwrap(), FetchOutcome::Discarded);

        let state = query.state();
        assert_eq!(state.key, Some(key("new")));
        assert!(state.rows.is_empty());
        assert!(state.is_pending);

        let outcome = query
            .fetch_next_page(|key, offset, limit| {
                assert_eq!(key.params(), ["new".to_string()]);
                async move { Ok(rows(3, offset, limit)) }
            })
            .await
            .unwrap();
        assert_eq!(outcome, FetchOutcome::Appended { rows: 3 });
        assert_eq!(query.state().rows, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_key_change_restarts_from_offset_zero() {
        let query = InfiniteQuery::new(20);
        query.set_key(key("a"));
        query
            .fetch_next_page(|_, offset, limit| async move { Ok(rows(45, offset, limit)) })
            .await
            .unwrap();

        assert!(!query.set_key(key("a")));
        assert_eq!(query.state().pages, 1);

        assert!(query.set_key(key("b")));
        let seen_offset = Arc::new(AtomicUsize::new(usize::MAX));
        {
            let seen_offset = Arc::clone(&seen_offset);
            query
                .fetch_next_page(move |_, offset, limit| {
                    seen_offset.store(offset, Ordering::SeqCst);
                    async move { Ok(rows(45, offset, limit)) }
                })
                .await
                .unwrap();
        }
        assert_eq!(seen_offset.load(Ordering::SeqCst), 0);
        assert_eq!(query.state().pages, 1);
    }

    #[tokio::test]
    async fn test_failed_page_keeps_earlier_pages() {
        let query = InfiniteQuery::new(20);
        query.set_key(key("1"));
        query
            .fetch_next_page(|_, offset, limit| async move { Ok(rows(45, offset, limit)) })
            .await
            .unwrap();

        let err = query
            .fetch_next_page(|_, _, _| async {
                Err::<Vec<usize>, _>(RequestError::Http {
                    status: 503,
                    status_text: "Service Unavailable".to_string(),
                })
            })
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(503));

        let state = query.state();
        assert!(state.is_error);
        assert_eq!(state.rows.len(), 20);
        assert!(state.has_next_page);

        // Retrying is an explicit caller action and resumes at the same offset.
        let outcome = query
            .fetch_next_page(|_, offset, limit| {
                assert_eq!(offset, 20);
                async move { Ok(rows(45, offset, limit)) }
            })
            .await
            .unwrap();
        assert_eq!(outcome, FetchOutcome::Appended { rows: 20 });
        assert!(!query.state().is_error);
    }

    #[tokio::test]
    async fn test_fetching_next_page_flag() {
        let query = InfiniteQuery::new(2);
        query.set_key(key("1"));
        query
            .fetch_next_page(|_, offset, limit| async move { Ok(rows(10, offset, limit)) })
            .await
            .unwrap();

        let (tx, rx) = oneshot::channel::<()>();
        let next = query.fetch_next_page(move |_, offset, limit| async move {
            rx.await.ok();
            Ok(rows(10, offset, limit))
        });
        let check = async {
            tokio::task::yield_now().await;
            let state = query.state();
            assert!(state.is_fetching_next_page);
            assert!(!state.is_pending);
            tx.send(()).unwrap();
        };
        let (outcome, ()) = tokio::join!(next, check);
        assert_eq!(outcome.unwrap(), FetchOutcome::Appended { rows: 2 });
        assert!(!query.state().is_fetching_next_page);
    }
}
