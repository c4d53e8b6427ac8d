use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable selecting the backend base URL
pub const API_URL_ENV: &str = "EVAL_API_URL";

/// Backend address used when nothing else is configured
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Largest page the backend accepts
const MAX_PAGE_LIMIT: usize = 100;

/// Dashboard configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Base URL of the evaluation backend
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Rows requested per benchmark page
    #[serde(default = "default_page_limit")]
    pub page_limit: usize,
    /// Benchmark selected at start-up
    #[serde(default = "default_benchmark_id")]
    pub default_benchmark_id: String,
    /// Attempts scoring strictly above this are shown as correct
    #[serde(default = "default_correctness_threshold")]
    pub correctness_threshold: f64,
    /// Age after which cached responses are refetched; unset keeps them for the session
    #[serde(default)]
    pub stale_time_secs: Option<u64>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_page_limit() -> usize {
    20
}

fn default_benchmark_id() -> String {
    "1".to_string()
}

fn default_correctness_threshold() -> f64 {
    0.5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            page_limit: default_page_limit(),
            default_benchmark_id: default_benchmark_id(),
            correctness_threshold: default_correctness_threshold(),
            stale_time_secs: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
    }

    /// Resolve the configuration once at start-up.
    ///
    /// Precedence: `api_url_arg`, then `EVAL_API_URL`, then the file, then defaults.
    pub fn load(path: Option<&Path>, api_url_arg: Option<String>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        let config = config
            .with_api_url(std::env::var(API_URL_ENV).ok())
            .with_api_url(api_url_arg);

        config.validate()?;
        Ok(config)
    }

    /// Replace the base URL when an override is present and non-empty
    pub fn with_api_url(mut self, api_url: Option<String>) -> Self {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            self.api_url = url;
        }
        self.api_url = self.api_url.trim().trim_end_matches('/').to_string();
        self
    }

    /// Cache staleness policy derived from `stale_time_secs`
    pub fn stale_time(&self) -> Option<Duration> {
        self.stale_time_secs.map(Duration::from_secs)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            (1..=MAX_PAGE_LIMIT).contains(&self.page_limit),
            "page_limit must be between 1 and {}, got {}",
            MAX_PAGE_LIMIT,
            self.page_limit
        );
        ensure!(
            self.api_url.starts_with("http://") || self.api_url.starts_with("https://"),
            "api_url must be an http(s) URL, got {:?}",
            self.api_url
        );
        Ok(())
    }
}
