use crate::config::Config;
use crate::output::{self, OutputFormat};
use crate::pagination::FetchOutcome;
use crate::query::QueryState;
use crate::store::DashboardStore;
use crate::table::{SortDirection, SortSpec, Table};
use crate::views;
use anyhow::{Context, Result, ensure};
use std::sync::Arc;
use tracing::info;

/// How many benchmark pages a one-shot command loads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageCount {
    Pages(usize),
    All,
}

/// Runs single dashboard commands against the store and renders the result
pub struct Runner {
    store: Arc<DashboardStore>,
    config: Config,
    format: OutputFormat,
}

/// Turn a failed query into an error for the command line
fn check<T>(state: &QueryState<T>, what: &str) -> Result<()> {
    match &state.error {
        Some(err) if state.is_error() => {
            Err(err.clone()).with_context(|| format!("Failed to load {}", what))
        }
        _ => Ok(()),
    }
}

/// Apply a sort given by column id or header
pub fn apply_sort<R, A>(table: &mut Table<R, A>, column: &str, direction: SortDirection) -> Result<()> {
    let id = table
        .find_column(column)
        .map(|c| c.id().to_string())
        .unwrap_or_else(|| column.to_string());
    table.set_sort(SortSpec { column: id, direction })?;
    Ok(())
}

impl Runner {
    pub fn new(store: Arc<DashboardStore>, config: Config, format: OutputFormat) -> Self {
        Self {
            store,
            config,
            format,
        }
    }

    pub async fn leaderboard(&self, sort: Option<&str>, ascending: bool) -> Result<String> {
        let state = self.store.load_leaderboard().await;
        check(&state, "leaderboard")?;

        let categories = state
            .data
            .as_ref()
            .map(|d| d.category_names.clone())
            .unwrap_or_default();
        let mut table = views::leaderboard_table(&categories);
        if let Some(column) = sort {
            let direction = if ascending {
                SortDirection::Ascending
            } else {
                SortDirection::Descending
            };
            apply_sort(&mut table, column, direction)?;
        }
        Ok(output::leaderboard(&state, &table, self.format))
    }

    pub async fn benchmarks(&self) -> Result<String> {
        let state = self.store.load_benchmark_metadata().await;
        check(&state, "benchmark catalog")?;
        let selected = self.store.selection().selected_benchmark_id();
        Ok(output::benchmark_choices(&state, &selected, self.format))
    }

    pub async fn benchmark(
        &self,
        id: Option<String>,
        pages: PageCount,
        sort: Option<&str>,
        descending: bool,
    ) -> Result<String> {
        ensure!(
            pages != PageCount::Pages(0),
            "The first page is always loaded, pages must be at least 1"
        );
        if let Some(id) = id {
            self.store.selection().set_selected_benchmark_id(id);
        }
        let selected = self.store.selection().selected_benchmark_id();

        let metadata_state = self.store.load_benchmark_metadata().await;
        check(&metadata_state, "benchmark catalog")?;
        let metadata = metadata_state.data.as_deref().cloned().unwrap_or_default();

        let mut state = self.store.load_benchmark_rows().await;
        if let Some(err) = &state.error {
            return Err(err.clone())
                .with_context(|| format!("Failed to load benchmark {}", selected));
        }

        while state.has_next_page && pages.wants_more(state.pages) {
            let outcome = self
                .store
                .fetch_next_benchmark_page()
                .await
                .with_context(|| format!("Failed to load benchmark {}", selected))?;
            if let FetchOutcome::Appended { rows } = outcome {
                info!(benchmark_id = %selected, rows, "loaded benchmark page");
            }
            state = self.store.benchmark_rows();
        }

        let mut table = views::benchmark_table(&metadata.llms);
        if let Some(column) = sort {
            let direction = if descending {
                SortDirection::Descending
            } else {
                SortDirection::Ascending
            };
            apply_sort(&mut table, column, direction)?;
        }
        Ok(output::benchmark(&metadata, &selected, &table, &state, self.format))
    }

    pub async fn question(&self, id: String, llm_id: Option<&str>, attempt: usize) -> Result<String> {
        self.store.selection().set_active_question_id(Some(id.clone()));
        let state = self.store.load_question().await;
        check(&state, &format!("question {}", id))?;
        Ok(output::question(
            &state,
            llm_id,
            attempt,
            self.config.correctness_threshold,
            self.format,
        ))
    }
}

impl PageCount {
    fn wants_more(self, loaded: usize) -> bool {
        match self {
            PageCount::Pages(n) => loaded < n,
            PageCount::All => true,
        }
    }
}
