use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use eval_dashboard::api::ApiClient;
use eval_dashboard::config::Config;
use eval_dashboard::interactive::Session;
use eval_dashboard::output::OutputFormat;
use eval_dashboard::runner::{PageCount, Runner};
use eval_dashboard::store::DashboardStore;

/// Evaluation dashboard - browse LLM benchmark results from the command line
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL, overrides EVAL_API_URL and the config file
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Output format: plain or json
    #[arg(short, long, default_value = "plain", global = true)]
    output: OutputFormat,

    /// Verbose output - log every backend request
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the leaderboard
    Leaderboard {
        /// Column to sort by (id or header)
        #[arg(long)]
        sort: Option<String>,

        /// Sort ascending instead of descending
        #[arg(long, requires = "sort")]
        asc: bool,
    },

    /// List the benchmark catalog
    Benchmarks,

    /// Show the question table of one benchmark
    Benchmark {
        /// Benchmark id, defaults to the configured benchmark
        #[arg(long)]
        id: Option<String>,

        /// Number of pages to load, at least 1
        #[arg(
            long,
            default_value_t = 1,
            value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..),
            conflicts_with = "all"
        )]
        pages: usize,

        /// Load every page
        #[arg(long)]
        all: bool,

        /// Column to sort by (id or header)
        #[arg(long)]
        sort: Option<String>,

        /// Sort descending instead of ascending
        #[arg(long, requires = "sort")]
        desc: bool,
    },

    /// Show one question with a model's conversation
    Question {
        id: String,

        /// Model whose answer to show, defaults to the first
        #[arg(long)]
        llm: Option<String>,

        /// Attempt to show, counted from 0
        #[arg(long, default_value_t = 0)]
        attempt: usize,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("eval_dashboard=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = Config::load(args.config.as_deref(), args.api_url)?;
    let api = Arc::new(ApiClient::new(config.api_url.clone()));
    let store = Arc::new(DashboardStore::new(api, &config));

    let Some(command) = args.command else {
        return Session::new(store, &config, args.output).run().await;
    };

    let runner = Runner::new(store, config, args.output);
    let text = match command {
        Command::Leaderboard { sort, asc } => runner.leaderboard(sort.as_deref(), asc).await?,
        Command::Benchmarks => runner.benchmarks().await?,
        Command::Benchmark {
            id,
            pages,
            all,
            sort,
            desc,
        } => {
            let pages = if all {
                PageCount::All
            } else {
                PageCount::Pages(pages)
            };
            runner.benchmark(id, pages, sort.as_deref(), desc).await?
        }
        Command::Question { id, llm, attempt } => {
            runner.question(id, llm.as_deref(), attempt).await?
        }
    };
    print!("{}", text);

    Ok(())
}
