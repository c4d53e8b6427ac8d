use crate::config::Config;
use crate::models::{BenchmarkId, BenchmarkTableRow, LeaderboardRow};
use crate::output::{self, OutputFormat};
use crate::pagination::FetchOutcome;
use crate::store::DashboardStore;
use crate::table::Table;
use crate::views::{self, Navigation};
use anyhow::{Context, Result, anyhow, bail};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Screen the `sort`, `refresh` and `attempt` commands act on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Leaderboard,
    Benchmark,
    Question,
}

/// Result of one command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Output(String),
    Exit,
}

/// Interactive dashboard session. Tables keep their sort between commands.
pub struct Session {
    store: Arc<DashboardStore>,
    api_url: String,
    threshold: f64,
    format: OutputFormat,
    leaderboard: Table<LeaderboardRow>,
    benchmark: Table<BenchmarkTableRow, Navigation>,
    screen: Option<Screen>,
    benchmark_changes: watch::Receiver<BenchmarkId>,
    llm_id: Option<String>,
    attempt: usize,
}

fn parse_index(arg: Option<&&str>, what: &str) -> Result<usize> {
    let arg = arg.ok_or_else(|| anyhow!("Missing {}", what))?;
    arg.parse::<usize>()
        .with_context(|| format!("Invalid {}: {}", what, arg))
}

impl Session {
    pub fn new(store: Arc<DashboardStore>, config: &Config, format: OutputFormat) -> Self {
        let benchmark_changes = store.selection().subscribe_benchmark();
        Self {
            store,
            api_url: config.api_url.clone(),
            threshold: config.correctness_threshold,
            format,
            leaderboard: views::leaderboard_table(&[]),
            benchmark: views::benchmark_table(&[]),
            screen: None,
            benchmark_changes,
            llm_id: None,
            attempt: 0,
        }
    }

    /// Read commands from stdin until `exit` or end of input
    pub async fn run(&mut self) -> Result<()> {
        display_welcome(&self.api_url);

        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            print!("> ");
            stdout.flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                break; // EOF
            }

            match self.execute(&line).await {
                Ok(Reply::Output(text)) => print!("{}", text),
                Ok(Reply::Exit) => {
                    println!("  Goodbye!");
                    break;
                }
                Err(e) => println!("Error: {:#}", e),
            }
        }

        Ok(())
    }

    /// Execute a single command line
    pub async fn execute(&mut self, line: &str) -> Result<Reply> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(first) = parts.first() else {
            return Ok(Reply::Output(String::new()));
        };
        let cmd = first.to_lowercase();
        let args = &parts[1..];
        debug!(command = %cmd, ?args, "executing command");

        let text = match cmd.as_str() {
            "help" | "h" | "?" => help_text(),
            "leaderboard" | "l" => self.show_leaderboard().await,
            "benchmarks" | "b" => {
                let state = self.store.load_benchmark_metadata().await;
                let selected = self.store.selection().selected_benchmark_id();
                output::benchmark_choices(&state, &selected, self.format)
            }
            "select" => {
                let id = args.first().ok_or_else(|| anyhow!("Usage: select <benchmark_id>"))?;
                self.store.selection().set_selected_benchmark_id(*id);
                self.show_benchmark().await
            }
            "table" | "t" => self.show_benchmark().await,
            "more" | "m" => self.load_more().await,
            "sort" => {
                let column = args.first().ok_or_else(|| anyhow!("Usage: sort <column>"))?;
                self.toggle_sort(column)?;
                self.show_current().await
            }
            "open" => {
                let row = parse_index(args.first(), "row number")?;
                self.open_row(row, args.get(1).copied()).await?
            }
            "question" | "q" => {
                let id = args.first().ok_or_else(|| anyhow!("Usage: question <id> [llm_id]"))?;
                self.open_question(id.to_string(), args.get(1).map(|s| s.to_string()))
                    .await
            }
            "attempt" => {
                let llm = parse_index(args.first(), "model number")?;
                let attempt = parse_index(args.get(1), "attempt number")?;
                self.select_attempt(llm, attempt)?;
                self.show_question().await
            }
            "refresh" | "r" => {
                self.store.refresh();
                self.show_current().await
            }
            "exit" | "quit" => return Ok(Reply::Exit),
            _ => bail!("Unknown command: {}. Type 'help' for available commands.", cmd),
        };
        Ok(Reply::Output(text))
    }

    async fn show_current(&mut self) -> String {
        match self.screen {
            Some(Screen::Leaderboard) => self.show_leaderboard().await,
            Some(Screen::Benchmark) => self.show_benchmark().await,
            Some(Screen::Question) => self.show_question().await,
            None => help_text(),
        }
    }

    async fn show_leaderboard(&mut self) -> String {
        self.screen = Some(Screen::Leaderboard);
        let state = self.store.load_leaderboard().await;
        if let Some(data) = &state.data {
            self.leaderboard
                .set_columns(views::leaderboard_columns(&data.category_names));
        }
        output::leaderboard(&state, &self.leaderboard, self.format)
    }

    async fn show_benchmark(&mut self) -> String {
        self.screen = Some(Screen::Benchmark);
        let metadata_state = self.store.load_benchmark_metadata().await;
        if let Some(status) = views::status_line(&metadata_state, "benchmark") {
            return format!("{}\n", status);
        }
        let metadata = metadata_state.data.as_deref().cloned().unwrap_or_default();
        // A newly selected benchmark starts from the default sort.
        if self.benchmark_changes.has_changed().unwrap_or(false) {
            let _ = self.benchmark_changes.borrow_and_update();
            self.benchmark = views::benchmark_table(&metadata.llms);
        } else {
            self.benchmark.set_columns(views::benchmark_columns(&metadata.llms));
        }

        let state = self.store.load_benchmark_rows().await;
        let selected = self.store.selection().selected_benchmark_id();
        output::benchmark(&metadata, &selected, &self.benchmark, &state, self.format)
    }

    async fn load_more(&mut self) -> String {
        match self.store.fetch_next_benchmark_page().await {
            Ok(FetchOutcome::Exhausted) => format!("{}\n", views::NO_MORE_DATA),
            Ok(_) => self.show_benchmark().await,
            Err(e) => format!("{}\n", e),
        }
    }

    fn toggle_sort(&mut self, column: &str) -> Result<()> {
        match self.screen {
            Some(Screen::Leaderboard) => {
                let id = self
                    .leaderboard
                    .find_column(column)
                    .map(|c| c.id().to_string())
                    .unwrap_or_else(|| column.to_string());
                self.leaderboard.toggle_sort(&id)?;
            }
            Some(Screen::Benchmark) => {
                let id = self
                    .benchmark
                    .find_column(column)
                    .map(|c| c.id().to_string())
                    .unwrap_or_else(|| column.to_string());
                self.benchmark.toggle_sort(&id)?;
            }
            _ => bail!("Nothing to sort: show the leaderboard or a benchmark table first"),
        }
        Ok(())
    }

    /// Open the row at 1-based display position `row`, or one model's answer
    /// to it when `llm_id` is given
    async fn open_row(&mut self, row: usize, llm_id: Option<&str>) -> Result<String> {
        let index = row.checked_sub(1).ok_or_else(|| anyhow!("Rows are numbered from 1"))?;
        let rows = self.store.benchmark_rows().rows;
        if rows.is_empty() {
            bail!("Show a benchmark table first");
        }
        let navigation = match llm_id {
            Some(llm_id) => {
                if index >= rows.len() {
                    bail!("No row {}", row);
                }
                // Model columns come from the catalog, which may not have been rendered yet.
                if let Some(metadata) = self.store.load_benchmark_metadata().await.data {
                    self.benchmark.set_columns(views::benchmark_columns(&metadata.llms));
                }
                self.benchmark
                    .click_cell(&rows, index, &views::llm_column_id(llm_id))
                    .ok_or_else(|| anyhow!("Unknown model: {}", llm_id))?
            }
            None => self
                .benchmark
                .click_row(&rows, index)
                .ok_or_else(|| anyhow!("No row {}", row))?,
        };

        let Navigation::Question { id, llm_id } = navigation;
        Ok(self.open_question(id, llm_id).await)
    }

    async fn open_question(&mut self, id: String, llm_id: Option<String>) -> String {
        self.store.selection().set_active_question_id(Some(id));
        self.llm_id = llm_id;
        self.attempt = 0;
        self.show_question().await
    }

    async fn show_question(&mut self) -> String {
        self.screen = Some(Screen::Question);
        let state = self.store.load_question().await;
        output::question(
            &state,
            self.llm_id.as_deref(),
            self.attempt,
            self.threshold,
            self.format,
        )
    }

    /// Pick model `llm` (1-based, as listed) and its attempt `attempt` (from 0)
    fn select_attempt(&mut self, llm: usize, attempt: usize) -> Result<()> {
        let question = self
            .store
            .question()
            .data
            .ok_or_else(|| anyhow!("No question is open"))?;
        let answer = llm
            .checked_sub(1)
            .and_then(|i| question.llm_answers.get(i))
            .ok_or_else(|| anyhow!("No model {}", llm))?;
        if attempt >= answer.attempts.len() {
            bail!("{} has no attempt {}", answer.llm_name, attempt);
        }
        self.llm_id = Some(answer.llm_id.clone());
        self.attempt = attempt;
        Ok(())
    }
}

fn display_welcome(api_url: &str) {
    println!();
    println!("  Evaluation dashboard - {}", api_url);
    println!("  Type 'help' for available commands.");
    println!();
}

fn help_text() -> String {
    [
        "Commands:",
        "  leaderboard, l              Show the leaderboard",
        "  benchmarks, b               List benchmarks (* marks the selected one)",
        "  select <id>                 Select a benchmark and show its table",
        "  table, t                    Show the selected benchmark table",
        "  more, m                     Load the next page of the benchmark table",
        "  sort <column>               Sort the current table, again to reverse",
        "  open <row> [llm_id]         Open a question from the benchmark table",
        "  question, q <id> [llm_id]   Open a question by id",
        "  attempt <llm#> <n>          Show attempt n (from 0) of model llm#",
        "  refresh, r                  Refetch the current screen",
        "  help, h, ?                  Show this help",
        "  exit, quit                  Leave the dashboard",
        "",
    ]
    .join("\n")
}
