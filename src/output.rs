use crate::models::{
    BenchmarkMetadata, BenchmarkTableRow, LeaderboardResponse, LeaderboardRow, QuestionResponse,
};
use crate::pagination::PagedState;
use crate::query::QueryState;
use crate::table::Table;
use crate::views::{self, Navigation};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
pub enum OutputFormat {
    #[default]
    Plain,
    Json,
}

/// Serialize to pretty JSON, reporting serialization failures inline
fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    match serde_json::to_string_pretty(value) {
        Ok(json) => format!("{}\n", json),
        Err(e) => format!("Error serializing results to JSON: {}\n", e),
    }
}

fn status_json(status: String) -> String {
    to_json(&json!({ "status": status }))
}

pub fn leaderboard(
    state: &QueryState<LeaderboardResponse>,
    table: &Table<LeaderboardRow>,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Plain => views::render_leaderboard_state(state, table),
        OutputFormat::Json => match (views::status_line(state, "leaderboard"), &state.data) {
            (Some(status), _) => status_json(status),
            (None, Some(data)) => to_json(&json!({
                "category_names": data.category_names,
                "table_rows": table.sorted_rows(&data.table_rows),
            })),
            (None, None) => status_json(views::NO_DATA.to_string()),
        },
    }
}

pub fn benchmark_choices(
    state: &QueryState<BenchmarkMetadata>,
    selected_id: &str,
    format: OutputFormat,
) -> String {
    if let Some(status) = views::status_line(state, "benchmark") {
        return match format {
            OutputFormat::Plain => format!("{}\n", status),
            OutputFormat::Json => status_json(status),
        };
    }
    let metadata = state.data.as_deref().cloned().unwrap_or_default();
    let choices = views::benchmark_choices(&metadata, selected_id);
    match format {
        OutputFormat::Plain => views::render_benchmark_choices(&choices),
        OutputFormat::Json => to_json(&choices),
    }
}

pub fn benchmark(
    metadata: &BenchmarkMetadata,
    selected_id: &str,
    table: &Table<BenchmarkTableRow, Navigation>,
    state: &PagedState<BenchmarkTableRow>,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Plain => views::render_benchmark(metadata, selected_id, table, state),
        OutputFormat::Json => match views::paged_status_line(state) {
            Some(status) => status_json(status),
            None => to_json(&json!({
                "benchmark_id": selected_id,
                "benchmark_name": metadata.benchmark_name(selected_id),
                "table_rows": table.sorted_rows(&state.rows),
                "has_next_page": state.has_next_page,
            })),
        },
    }
}

pub fn question(
    state: &QueryState<QuestionResponse>,
    llm_id: Option<&str>,
    attempt: usize,
    threshold: f64,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Plain => views::render_question_state(state, llm_id, attempt, threshold),
        OutputFormat::Json => match (views::status_line(state, "conversation"), &state.data) {
            (Some(status), _) => status_json(status),
            (None, Some(data)) => to_json(&**data),
            (None, None) => status_json(views::NO_DATA.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RequestError;
    use crate::query::QueryStatus;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn leaderboard_state() -> QueryState<LeaderboardResponse> {
        let row = |rank: i64, name: &str, score: f64| LeaderboardRow {
            rank,
            llm_name: name.to_string(),
            overall_score: score,
            category_scores: HashMap::new(),
        };
        QueryState {
            status: QueryStatus::Success,
            data: Some(Arc::new(LeaderboardResponse {
                category_names: vec![],
                table_rows: vec![row(2, "b", 80.0), row(1, "a", 95.0)],
            })),
            error: None,
            is_fetching: false,
            is_stale: false,
        }
    }

    #[test]
    fn test_json_leaderboard_rows_follow_sort() {
        let table = views::leaderboard_table(&[]);
        let out = leaderboard(&leaderboard_state(), &table, OutputFormat::Json);

        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["table_rows"][0]["llm_name"], "a");
        assert_eq!(value["table_rows"][1]["llm_name"], "b");
    }

    #[test]
    fn test_plain_leaderboard() {
        let table = views::leaderboard_table(&[]);
        let out = leaderboard(&leaderboard_state(), &table, OutputFormat::Plain);
        assert!(out.starts_with("Rank | Model | Overall Score ↓"));
    }

    #[test]
    fn test_json_error_status() {
        let state = QueryState::<QuestionResponse> {
            status: QueryStatus::Error,
            data: None,
            error: Some(RequestError::Network("connection refused".to_string())),
            is_fetching: false,
            is_stale: false,
        };
        let out = question(&state, None, 0, 0.5, OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["status"], "Network error: connection refused");
    }

    #[test]
    fn test_disabled_question_json() {
        let out = question(&QueryState::disabled(), None, 0, 0.5, OutputFormat::Json);
        assert!(out.contains("No data available."));
    }
}
