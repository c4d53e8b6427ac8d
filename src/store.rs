use crate::api::BenchmarkApi;
use crate::config::Config;
use crate::error::RequestError;
use crate::models::{
    BenchmarkMetadata, BenchmarkTableRow, LeaderboardResponse, QuestionResponse,
};
use crate::pagination::{FetchOutcome, InfiniteQuery, PagedState};
use crate::query::{CachePolicy, QueryCache, QueryKey, QueryState};
use crate::selection::Selection;
use std::sync::Arc;
use tracing::debug;

const LEADERBOARD: &str = "leaderboard";
const BENCHMARK_METADATA: &str = "benchmark-metadata";
const BENCHMARK: &str = "benchmark";
const QUESTION: &str = "question";

/// Application state shared by every view: the backend client, the selection
/// cells and the query caches they parameterize.
pub struct DashboardStore {
    api: Arc<dyn BenchmarkApi>,
    selection: Selection,
    leaderboard: QueryCache<LeaderboardResponse>,
    metadata: QueryCache<BenchmarkMetadata>,
    questions: QueryCache<QuestionResponse>,
    benchmark_rows: InfiniteQuery<BenchmarkTableRow>,
}

impl DashboardStore {
    pub fn new(api: Arc<dyn BenchmarkApi>, config: &Config) -> Self {
        let policy = CachePolicy {
            stale_time: config.stale_time(),
        };
        Self {
            api,
            selection: Selection::new(config.default_benchmark_id.clone()),
            leaderboard: QueryCache::new(policy),
            // The catalog is fetched once and kept for the whole session.
            metadata: QueryCache::default(),
            questions: QueryCache::new(policy),
            benchmark_rows: InfiniteQuery::new(config.page_limit),
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn page_limit(&self) -> usize {
        self.benchmark_rows.limit()
    }

    fn leaderboard_key() -> QueryKey {
        QueryKey::new(LEADERBOARD)
    }

    fn metadata_key() -> QueryKey {
        QueryKey::new(BENCHMARK_METADATA)
    }

    fn question_key(id: &str) -> QueryKey {
        QueryKey::new(QUESTION).with_param(id)
    }

    fn benchmark_key(id: &str) -> QueryKey {
        QueryKey::new(BENCHMARK).with_param(id)
    }

    /// Fetch the leaderboard if needed and return its state
    pub async fn load_leaderboard(&self) -> QueryState<LeaderboardResponse> {
        let key = Self::leaderboard_key();
        let api = Arc::clone(&self.api);
        // Failures are recorded in the state returned below.
        let _ = self
            .leaderboard
            .fetch(&key, move || async move { api.get_leaderboard().await })
            .await;
        self.leaderboard.state(&key)
    }

    pub fn leaderboard(&self) -> QueryState<LeaderboardResponse> {
        self.leaderboard.state(&Self::leaderboard_key())
    }

    /// Fetch the benchmark and model catalogs if needed and return their state
    pub async fn load_benchmark_metadata(&self) -> QueryState<BenchmarkMetadata> {
        let key = Self::metadata_key();
        let api = Arc::clone(&self.api);
        let _ = self
            .metadata
            .fetch(&key, move || async move { api.get_benchmark_metadata().await })
            .await;
        self.metadata.state(&key)
    }

    pub fn benchmark_metadata(&self) -> QueryState<BenchmarkMetadata> {
        self.metadata.state(&Self::metadata_key())
    }

    /// Fetch the active question. Without an active question id no request is
    /// made and the state is disabled.
    pub async fn load_question(&self) -> QueryState<QuestionResponse> {
        let Some(id) = self.selection.active_question_id() else {
            debug!("no active question, query disabled");
            return QueryState::disabled();
        };

        let key = Self::question_key(&id);
        let api = Arc::clone(&self.api);
        let _ = self
            .questions
            .fetch(&key, move || async move { api.get_question(&id).await })
            .await;
        self.questions.state(&key)
    }

    pub fn question(&self) -> QueryState<QuestionResponse> {
        match self.selection.active_question_id() {
            Some(id) => self.questions.state(&Self::question_key(&id)),
            None => QueryState::disabled(),
        }
    }

    /// Align the paginated query with the selected benchmark, discarding the
    /// pages of a previous selection.
    fn sync_benchmark_key(&self) {
        let id = self.selection.selected_benchmark_id();
        self.benchmark_rows.set_key(Self::benchmark_key(&id));
    }

    /// Fetch the next page of the selected benchmark.
    ///
    /// The first call for a benchmark loads its first page.
    pub async fn fetch_next_benchmark_page(&self) -> Result<FetchOutcome, RequestError> {
        self.sync_benchmark_key();
        let api = Arc::clone(&self.api);
        self.benchmark_rows
            .fetch_next_page(move |key, offset, limit| {
                let benchmark_id = key.params().first().cloned().unwrap_or_default();
                async move {
                    api.get_benchmark_data(&benchmark_id, offset, limit)
                        .await
                        .map(|page| page.table_rows)
                }
            })
            .await
    }

    /// Load the first page of the selected benchmark unless it is already there.
    /// A first page that failed is requested again.
    pub async fn load_benchmark_rows(&self) -> PagedState<BenchmarkTableRow> {
        self.sync_benchmark_key();
        if self.benchmark_rows.state().pages == 0 {
            let _ = self.fetch_next_benchmark_page().await;
        }
        self.benchmark_rows.state()
    }

    /// Rows accumulated so far for the selected benchmark
    pub fn benchmark_rows(&self) -> PagedState<BenchmarkTableRow> {
        self.sync_benchmark_key();
        self.benchmark_rows.state()
    }

    /// Drop cached responses so the next load goes back to the backend.
    /// Accumulated benchmark pages are kept.
    pub fn refresh(&self) {
        self.leaderboard.invalidate(&Self::leaderboard_key());
        if let Some(id) = self.selection.active_question_id() {
            self.questions.invalidate(&Self::question_key(&id));
        }
    }
}
