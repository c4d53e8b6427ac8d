use crate::error::RequestError;
use crate::models::{BenchmarkMetadata, BenchmarkPage, LeaderboardResponse, QuestionResponse};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Rows per benchmark page when the caller does not choose
pub const DEFAULT_PAGE_LIMIT: usize = 20;

/// Read-only access to the evaluation backend.
///
/// The store only talks to the backend through this trait, so tests can drive
/// it with an in-memory implementation.
#[async_trait]
pub trait BenchmarkApi: Send + Sync {
    /// `GET /api/questions/{id}`
    async fn get_question(&self, id: &str) -> Result<QuestionResponse, RequestError>;

    /// `GET /api/benchmarks/metadata`
    async fn get_benchmark_metadata(&self) -> Result<BenchmarkMetadata, RequestError>;

    /// `GET /api/benchmarks/{benchmark_id}?offset=&limit=`
    async fn get_benchmark_data(
        &self,
        benchmark_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<BenchmarkPage, RequestError>;

    /// `GET /api/leaderboard/`
    async fn get_leaderboard(&self) -> Result<LeaderboardResponse, RequestError>;
}

/// HTTP implementation of [`BenchmarkApi`] backed by reqwest
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client around a preconfigured reqwest client
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Issue a GET and decode the JSON body. Non-2xx responses fail without
    /// reading the body.
    async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, RequestError> {
        let url = self.url(endpoint);
        debug!(method = "GET", url = %url, "sending request");

        let response = self
            .client
            .get(&url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .query(query)
            .send()
            .await
            .inspect_err(|e| warn!(url = %url, error = %e, "request failed"))?;

        let status = response.status();
        debug!(url = %url, status = status.as_u16(), "received response");

        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "backend returned an error status");
            return Err(RequestError::Http {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        response.json::<T>().await.map_err(RequestError::from)
    }
}

#[async_trait]
impl BenchmarkApi for ApiClient {
    async fn get_question(&self, id: &str) -> Result<QuestionResponse, RequestError> {
        self.request(&format!("/api/questions/{}", id), &[]).await
    }

    async fn get_benchmark_metadata(&self) -> Result<BenchmarkMetadata, RequestError> {
        self.request("/api/benchmarks/metadata", &[]).await
    }

    async fn get_benchmark_data(
        &self,
        benchmark_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<BenchmarkPage, RequestError> {
        let query = [("offset", offset.to_string()), ("limit", limit.to_string())];
        self.request(&format!("/api/benchmarks/{}", benchmark_id), &query)
            .await
    }

    async fn get_leaderboard(&self) -> Result<LeaderboardResponse, RequestError> {
        self.request("/api/leaderboard/", &[]).await
    }
}
