//! # pdfqa CLI
//!
//! Chat with PDF documents from the terminal, or serve the same pipeline
//! over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! pdfqa --config ./config/pdfqa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pdfqa inspect <pdf>...` | Show pages and chunk counts without calling any service |
//! | `pdfqa ask "<question>" --pdf <pdf>...` | Load PDFs and answer one question |
//! | `pdfqa chat [--pdf <pdf>...]` | Interactive chat session |
//! | `pdfqa serve` | Start the HTTP API |
//!
//! Credentials come from `GOOGLE_API_KEY` (Gemini, the default) or
//! `OPENAI_API_KEY`; a `.env` file in the working directory is read at
//! startup. Logs go to stderr and are controlled with `RUST_LOG`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use pdfqa::{chat, config, inspect, server};

const DEFAULT_CONFIG: &str = "./config/pdfqa.toml";

/// pdfqa: ask questions about PDF documents.
#[derive(Parser)]
#[command(
    name = "pdfqa",
    about = "Chat with your PDFs: retrieval-augmented question answering",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// When left at the default and the file does not exist, built-in
    /// defaults are used.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract and chunk PDFs, printing counts. Calls no external service.
    Inspect {
        /// PDF files to inspect.
        #[arg(required = true)]
        pdfs: Vec<PathBuf>,
    },

    /// Load PDFs and answer a single question.
    Ask {
        /// The question.
        question: String,

        /// PDF files to load (repeatable).
        #[arg(long = "pdf", required = true)]
        pdfs: Vec<PathBuf>,

        /// Also print the retrieved sources.
        #[arg(long)]
        sources: bool,
    },

    /// Interactive chat over stdin.
    Chat {
        /// PDF files to load before the first question (repeatable).
        #[arg(long = "pdf")]
        pdfs: Vec<PathBuf>,
    },

    /// Start the HTTP API on `[server].bind`.
    Serve,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pdfqa=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let required = cli.config != PathBuf::from(DEFAULT_CONFIG);
    let cfg = config::resolve_config(&cli.config, required)?;

    match cli.command {
        Commands::Inspect { pdfs } => {
            inspect::run_inspect(&cfg, &pdfs)?;
        }
        Commands::Ask {
            question,
            pdfs,
            sources,
        } => {
            chat::run_ask(&cfg, &question, &pdfs, sources).await?;
        }
        Commands::Chat { pdfs } => {
            chat::run_chat(&cfg, &pdfs).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
