//! educheck: check recognized homework text from the command line.
//!
//! Usage:
//!   educheck analyze --subject math --text "5+3=9"
//!   echo "他快速的跑着" | educheck analyze --subject 语文 --pretty
//!   educheck batch --subject english --questions questions.json

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use educheck::config::Config;
use educheck::dispatch::Dispatcher;
use educheck::types::Question;
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "educheck")]
#[command(about = "Homework checking for math, Chinese and English", long_about = None)]
struct Cli {
    /// Pretty-print the JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one block of text
    Analyze {
        #[arg(short, long)]
        subject: String,
        /// Text to analyze; reads stdin when neither --text nor --file is given
        #[arg(short, long, conflicts_with = "file")]
        text: Option<String>,
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Analyze a JSON array of {number, content, type} questions
    Batch {
        #[arg(short, long)]
        subject: String,
        #[arg(short, long)]
        questions: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    // Logs go to stderr so stdout stays valid JSON.
    tracing_subscriber::fmt()
        .with_env_filter(config.runtime.log_level.as_str())
        .with_writer(std::io::stderr)
        .init();

    let dispatcher = Dispatcher::from_config(&config)?;

    match cli.command {
        Commands::Analyze {
            subject,
            text,
            file,
        } => {
            let text = match (text, file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                (None, None) => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            print_json(&dispatcher.respond(&subject, &text), cli.pretty)
        }
        Commands::Batch { subject, questions } => {
            let raw = std::fs::read_to_string(&questions)
                .with_context(|| format!("reading {}", questions.display()))?;
            let questions: Vec<Question> =
                serde_json::from_str(&raw).context("questions file must be a JSON array")?;
            info!("Loaded {} question(s)", questions.len());

            let run = dispatcher.analyze_questions(&subject, questions);
            let report = match config.batch.timeout_ms {
                0 => run.await,
                ms => tokio::time::timeout(Duration::from_millis(ms), run)
                    .await
                    .with_context(|| format!("batch analysis timed out after {} ms", ms))?,
            };
            print_json(&report, cli.pretty)
        }
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", out);
    Ok(())
}
