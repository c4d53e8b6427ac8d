use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifier of a benchmark in the catalog
pub type BenchmarkId = String;

/// Catalog entry for a single benchmark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkMeta {
    pub id: BenchmarkId,
    pub name: String,
    pub description: String,
}

/// Catalog entry for a single evaluated model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmMeta {
    pub id: String,
    pub name: String,
}

/// Both catalogs, fetched once per session
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BenchmarkMetadata {
    pub benchmarks: Vec<BenchmarkMeta>,
    pub llms: Vec<LlmMeta>,
}

impl BenchmarkMetadata {
    /// Look up a benchmark by id
    pub fn benchmark(&self, id: &str) -> Option<&BenchmarkMeta> {
        self.benchmarks.iter().find(|b| b.id == id)
    }

    /// Display name for a benchmark id, `"Unknown"` when it is not in the catalog
    pub fn benchmark_name(&self, id: &str) -> &str {
        self.benchmark(id).map(|b| b.name.as_str()).unwrap_or("Unknown")
    }
}

/// Per-model result for one benchmark question
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkModelMeta {
    pub score: f64,
}

/// One evaluated question in a benchmark table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkTableRow {
    pub id: i64,
    pub question: String,
    pub difficulty: f64,
    /// Keyed by llm id. Sparse: a model may have no entry for a row.
    #[serde(default)]
    pub model_metas: HashMap<String, BenchmarkModelMeta>,
}

impl BenchmarkTableRow {
    /// Score of the given model for this row, if it was evaluated
    pub fn score_for(&self, llm_id: &str) -> Option<f64> {
        self.model_metas.get(llm_id).map(|m| m.score)
    }
}

/// One page of benchmark rows as returned by the backend
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BenchmarkPage {
    pub table_rows: Vec<BenchmarkTableRow>,
}

/// One model's line on the leaderboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub rank: i64,
    pub llm_name: String,
    pub overall_score: f64,
    #[serde(default)]
    pub category_scores: HashMap<String, f64>,
}

/// Leaderboard table together with the ordered category names
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LeaderboardResponse {
    #[serde(default)]
    pub category_names: Vec<String>,
    pub table_rows: Vec<LeaderboardRow>,
}

/// Speaker of a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// A single scored attempt with its full transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionAttemptAnswer {
    pub index: i64,
    pub score: f64,
    pub messages: Vec<Message>,
}

impl QuestionAttemptAnswer {
    /// Whether the attempt counts as correct for display purposes
    pub fn is_correct(&self, threshold: f64) -> bool {
        self.score > threshold
    }
}

/// All attempts of one model on a question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionLlmAnswer {
    pub llm_id: String,
    pub llm_name: String,
    pub attempts: Vec<QuestionAttemptAnswer>,
}

/// Drill-down payload for a single question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub id: String,
    pub difficulty: f64,
    pub benchmark_category: String,
    pub question: String,
    pub llm_answers: Vec<QuestionLlmAnswer>,
}
