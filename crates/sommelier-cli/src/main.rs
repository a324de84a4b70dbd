use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod context;

use context::AppContext;

#[derive(Parser)]
#[command(name = "sommelier")]
#[command(about = "AI Sommelier - fragrance recommendations from your catalog", long_about = None)]
struct Cli {
    /// Path to config.toml (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the key-value store holding quota state
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the sommelier a question about the catalog
    Ask {
        /// The shopper's question
        question: String,

        /// JSON file holding the product catalog
        #[arg(long)]
        catalog: PathBuf,

        /// JSON file holding the conversation; both new turns are appended
        #[arg(long)]
        history: Option<PathBuf>,
    },
    /// Show quota usage for this device
    Quota,
    /// Check whether a question would be accepted
    Validate {
        text: String,
    },
    /// Print this device's fingerprint and the signals behind it
    Fingerprint,
    /// List upstream models and the one the resolver picks
    Models,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = AppContext::load(cli.config, cli.storage)?;

    match cli.command {
        Commands::Ask {
            question,
            catalog,
            history,
        } => commands::ask::run(&ctx, &question, &catalog, history.as_deref()).await?,
        Commands::Quota => commands::quota::run(&ctx),
        Commands::Validate { text } => commands::validate::run(&ctx, &text),
        Commands::Fingerprint => commands::fingerprint::run(),
        Commands::Models => commands::models::run(&ctx).await?,
    }

    Ok(())
}
