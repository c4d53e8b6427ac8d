//! Column sets and text renderings for the leaderboard, benchmark and
//! question screens.

use crate::models::{
    BenchmarkMetadata, BenchmarkTableRow, LeaderboardResponse, LeaderboardRow, LlmMeta,
    QuestionAttemptAnswer, QuestionLlmAnswer, QuestionResponse, Role,
};
use crate::pagination::PagedState;
use crate::query::QueryState;
use crate::table::{Align, ColumnDef, SortSpec, Table};
use serde::Serialize;

pub const LOADING_MORE: &str = "Loading more data...";
pub const NO_MORE_DATA: &str = "No more data to load";
pub const NO_DATA: &str = "No data available.";

/// Where a click in the benchmark table leads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Question { id: String, llm_id: Option<String> },
}

/// Pending and error states as a single line, `None` once data is usable
pub fn status_line<T>(state: &QueryState<T>, what: &str) -> Option<String> {
    if state.is_pending() {
        Some(format!("Loading {} data...", what))
    } else if state.is_error() {
        state.error.as_ref().map(ToString::to_string)
    } else {
        None
    }
}

/// Same as [`status_line`] for the paginated benchmark rows
pub fn paged_status_line<R>(state: &PagedState<R>) -> Option<String> {
    if state.is_pending {
        Some("Loading data...".to_string())
    } else if state.is_error {
        state.error.as_ref().map(ToString::to_string)
    } else {
        None
    }
}

/// Message shown under the benchmark table
pub fn benchmark_footer<R>(state: &PagedState<R>) -> Option<&'static str> {
    if state.is_fetching_next_page {
        Some(LOADING_MORE)
    } else if !state.has_next_page && !state.rows.is_empty() {
        Some(NO_MORE_DATA)
    } else {
        None
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn leaderboard_columns(category_names: &[String]) -> Vec<ColumnDef<LeaderboardRow>> {
    let mut columns = vec![
        ColumnDef::plain("rank", "Rank", |r: &LeaderboardRow| r.rank.into()),
        ColumnDef::plain("llm_name", "Model", |r: &LeaderboardRow| r.llm_name.as_str().into())
            .align(Align::Right),
        ColumnDef::plain("overall_score", "Overall Score", |r: &LeaderboardRow| {
            r.overall_score.into()
        }),
    ];

    for name in category_names {
        let key = name.clone();
        columns.push(ColumnDef::derived(name.as_str(), capitalize(name), move |r: &LeaderboardRow| {
            r.category_scores.get(&key).copied().into()
        }));
    }
    columns
}

/// Leaderboard table sorted by overall score, best first
pub fn leaderboard_table(category_names: &[String]) -> Table<LeaderboardRow> {
    Table::new(leaderboard_columns(category_names)).with_sort(SortSpec::descending("overall_score"))
}

/// Column id of the score column for one model
pub fn llm_column_id(llm_id: &str) -> String {
    format!("llm:{}", llm_id)
}

pub fn benchmark_columns(llms: &[LlmMeta]) -> Vec<ColumnDef<BenchmarkTableRow, Navigation>> {
    let mut columns = vec![
        ColumnDef::plain("id", "Id", |r: &BenchmarkTableRow| r.id.into()),
        ColumnDef::plain("question", "Question", |r: &BenchmarkTableRow| {
            r.question.as_str().into()
        })
        .max_width(60),
        ColumnDef::plain("difficulty", "Difficulty", |r: &BenchmarkTableRow| {
            r.difficulty.into()
        }),
    ];

    for llm in llms {
        let value_id = llm.id.clone();
        let action_id = llm.id.clone();
        columns.push(
            ColumnDef::actionable(
                llm_column_id(&llm.id),
                llm.name.as_str(),
                move |r: &BenchmarkTableRow| r.score_for(&value_id).into(),
                move |r: &BenchmarkTableRow| Navigation::Question {
                    id: r.id.to_string(),
                    llm_id: Some(action_id.clone()),
                },
            )
            .align(Align::Center),
        );
    }
    columns
}

/// Benchmark table sorted by question id; a row click opens the question
pub fn benchmark_table(llms: &[LlmMeta]) -> Table<BenchmarkTableRow, Navigation> {
    Table::new(benchmark_columns(llms))
        .with_sort(SortSpec::ascending("id"))
        .on_row_click(|r: &BenchmarkTableRow| Navigation::Question {
            id: r.id.to_string(),
            llm_id: None,
        })
}

/// One entry of the benchmark picker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkChoice {
    pub id: String,
    pub name: String,
    pub description: String,
    pub selected: bool,
}

pub fn benchmark_choices(metadata: &BenchmarkMetadata, selected_id: &str) -> Vec<BenchmarkChoice> {
    metadata
        .benchmarks
        .iter()
        .map(|b| BenchmarkChoice {
            id: b.id.clone(),
            name: b.name.clone(),
            description: b.description.clone(),
            selected: b.id == selected_id,
        })
        .collect()
}

pub fn render_benchmark_choices(choices: &[BenchmarkChoice]) -> String {
    if choices.is_empty() {
        return "No benchmarks available.\n".to_string();
    }
    let mut out = String::new();
    for choice in choices {
        let marker = if choice.selected { "*" } else { " " };
        out.push_str(&format!("{} [{}] {}", marker, choice.id, choice.name));
        if !choice.description.is_empty() {
            out.push_str(&format!(" - {}", choice.description));
        }
        out.push('\n');
    }
    out
}

/// Benchmark screen: title, table and footer
pub fn render_benchmark(
    metadata: &BenchmarkMetadata,
    selected_id: &str,
    table: &Table<BenchmarkTableRow, Navigation>,
    state: &PagedState<BenchmarkTableRow>,
) -> String {
    let mut out = format!(
        "Benchmark: {} [{}]\n\n",
        metadata.benchmark_name(selected_id),
        selected_id
    );
    if let Some(status) = paged_status_line(state) {
        out.push_str(&status);
        out.push('\n');
        return out;
    }
    out.push_str(&table.render(&state.rows).to_text());
    if let Some(footer) = benchmark_footer(state) {
        out.push('\n');
        out.push_str(footer);
        out.push('\n');
    }
    out
}

/// Model and attempt shown on the question screen.
///
/// An unknown `llm_id` falls back to the first model; an out-of-range attempt
/// falls back to the first attempt.
#[derive(Debug, Clone, Copy)]
pub struct QuestionDetail<'a> {
    question: &'a QuestionResponse,
    llm_index: Option<usize>,
    attempt_index: Option<usize>,
    threshold: f64,
}

impl<'a> QuestionDetail<'a> {
    pub fn new(
        question: &'a QuestionResponse,
        llm_id: Option<&str>,
        attempt: usize,
        threshold: f64,
    ) -> Self {
        let llm_index = llm_id
            .and_then(|id| question.llm_answers.iter().position(|a| a.llm_id == id))
            .or_else(|| (!question.llm_answers.is_empty()).then_some(0));

        let attempt_index = llm_index.and_then(|i| {
            let attempts = &question.llm_answers[i].attempts;
            if attempt < attempts.len() {
                Some(attempt)
            } else if attempts.is_empty() {
                None
            } else {
                Some(0)
            }
        });

        Self {
            question,
            llm_index,
            attempt_index,
            threshold,
        }
    }

    pub fn selected_llm(&self) -> Option<&'a QuestionLlmAnswer> {
        self.llm_index.map(|i| &self.question.llm_answers[i])
    }

    pub fn selected_attempt(&self) -> Option<&'a QuestionAttemptAnswer> {
        let llm = self.selected_llm()?;
        self.attempt_index.map(|i| &llm.attempts[i])
    }

    pub fn render(&self) -> String {
        let q = self.question;
        let mut out = format!(
            "ID: {}  Difficulty: {}  Category: {}\n\nQuestion\n{}\n\n",
            q.id, q.difficulty, q.benchmark_category, q.question
        );

        if q.llm_answers.is_empty() {
            out.push_str("No model answers.\n");
            return out;
        }

        for (i, llm) in q.llm_answers.iter().enumerate() {
            let llm_selected = self.llm_index == Some(i);
            let marker = if llm_selected { "*" } else { " " };
            let attempts: Vec<String> = llm
                .attempts
                .iter()
                .enumerate()
                .map(|(j, attempt)| {
                    let mark = if attempt.is_correct(self.threshold) { "✓" } else { "✗" };
                    if llm_selected && self.attempt_index == Some(j) {
                        format!("[{}]", mark)
                    } else {
                        mark.to_string()
                    }
                })
                .collect();
            out.push_str(&format!(
                "{} {}. {} [{}] {}\n",
                marker,
                i + 1,
                llm.llm_name,
                llm.llm_id,
                attempts.join(" ")
            ));
        }

        if let (Some(llm), Some(attempt)) = (self.selected_llm(), self.selected_attempt()) {
            let verdict = if attempt.is_correct(self.threshold) {
                "Correct"
            } else {
                "Incorrect"
            };
            out.push_str(&format!(
                "\n{} - attempt {} (score {}, {})\n\n",
                llm.llm_name, attempt.index, attempt.score, verdict
            ));
            for message in &attempt.messages {
                let speaker = match message.role {
                    Role::User => "You",
                    Role::Assistant => "Assistant",
                };
                out.push_str(&format!("{}:\n{}\n\n", speaker, message.content));
            }
        }
        out
    }
}

/// Question screen for any query state
pub fn render_question_state(
    state: &QueryState<QuestionResponse>,
    llm_id: Option<&str>,
    attempt: usize,
    threshold: f64,
) -> String {
    if let Some(status) = status_line(state, "conversation") {
        return format!("{}\n", status);
    }
    match &state.data {
        Some(question) => QuestionDetail::new(question, llm_id, attempt, threshold).render(),
        None => format!("{}\n", NO_DATA),
    }
}

/// Leaderboard screen for any query state
pub fn render_leaderboard_state(
    state: &QueryState<LeaderboardResponse>,
    table: &Table<LeaderboardRow>,
) -> String {
    if let Some(status) = status_line(state, "leaderboard") {
        return format!("{}\n", status);
    }
    match &state.data {
        Some(leaderboard) => table.render(&leaderboard.table_rows).to_text(),
        None => format!("{}\n", NO_DATA),
    }
}
