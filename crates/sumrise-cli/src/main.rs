//! sumrise CLI — practice arithmetic questions against a grading service.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "sumrise", version, about = "Practice-question client for the sumrise grading service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a set of questions and submit them for grading
    Practice {
        /// Topic slug, or "all"
        #[arg(long)]
        topic: Option<String>,

        /// Number of questions (1-50)
        #[arg(long)]
        count: Option<usize>,

        /// TOML or JSON file mapping question ids to answers
        #[arg(long)]
        answers: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Evaluate an arithmetic expression on the grading service
    Evaluate {
        /// Expression, e.g. "2*(3+4)"
        #[arg(allow_hyphen_values = true)]
        expr: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List recent attempts
    Attempts {
        /// Maximum number of attempts to show
        #[arg(long)]
        limit: Option<u32>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show one stored attempt
    Attempt {
        /// Attempt id
        id: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List the topics in the question pool
    Topics {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Check answers locally without contacting the service
    Validate {
        /// Answers to check
        #[arg(required = true, allow_hyphen_values = true)]
        answers: Vec<String>,
    },

    /// Create a starter sumrise.toml
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(
                    "sumrise=info,sumrise_core=info,sumrise_client=info",
                )
            }),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Practice {
            topic,
            count,
            answers,
            config,
        } => commands::practice::execute(topic, count, answers, config).await,
        Commands::Evaluate { expr, config } => commands::evaluate::execute(expr, config).await,
        Commands::Attempts { limit, config } => {
            commands::attempts::list(limit, config).await
        }
        Commands::Attempt { id, config } => commands::attempts::show(id, config).await,
        Commands::Topics { config } => commands::topics::execute(config).await,
        Commands::Validate { answers } => commands::validate::execute(answers),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
