//! # Analyst Copilot CLI (`copilot`)
//!
//! ## Usage
//!
//! ```bash
//! copilot --config ./config/copilot.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `copilot serve` | Start the HTTP server (`/chat`, `/upload`, `/health`) |
//! | `copilot ask "<question>"` | Answer one question from the knowledge base |
//! | `copilot ask "<question>" --dataset sales.csv` | Answer against a dataset file |
//! | `copilot profile sales.xlsx` | Profile a CSV/XLSX file |
//! | `copilot stats` | Show knowledge index statistics |
//!
//! Logging goes to stderr. `RUST_LOG` overrides the level; `--verbose`
//! raises the default to `debug`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use analyst_copilot::{commands, config, server};

/// Analyst Copilot: answers analytics questions from a curated knowledge
/// base or an uploaded CSV/XLSX dataset.
#[derive(Parser)]
#[command(
    name = "copilot",
    about = "Analyst Copilot: offline analytics Q&A over a knowledge base and uploaded datasets",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/copilot.toml`. A missing file at the default
    /// path falls back to built-in defaults.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

const DEFAULT_CONFIG: &str = "./config/copilot.toml";

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server on `[server].bind`.
    Serve,

    /// Answer a single question.
    Ask {
        /// The question text.
        question: String,

        /// Load this CSV/XLSX file as the current dataset first.
        #[arg(long)]
        dataset: Option<PathBuf>,
    },

    /// Parse and profile a CSV/XLSX file.
    Profile {
        /// File to profile.
        file: PathBuf,

        /// Print the profile as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show knowledge base and index statistics.
    Stats,
}

fn load(cli: &Cli) -> anyhow::Result<config::Config> {
    if cli.config == PathBuf::from(DEFAULT_CONFIG) && !cli.config.exists() {
        tracing::debug!("no config at default path, using defaults");
        return Ok(config::Config::default());
    }
    config::load_config(&cli.config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "analyst_copilot=debug,analyst_copilot_core=debug"
    } else {
        "analyst_copilot=info,analyst_copilot_core=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cfg = load(&cli)?;

    match cli.command {
        Commands::Serve => server::run_server(&cfg).await?,
        Commands::Ask { question, dataset } => {
            commands::run_ask(&cfg, &question, dataset.as_deref())?;
        }
        Commands::Profile { file, json } => commands::run_profile(&cfg, &file, json)?,
        Commands::Stats => commands::run_stats(&cfg)?,
    }

    Ok(())
}
