use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use stayscout_etl::Config;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "stayscout", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the database (default: ~/.local/share/stayscout/stayscout.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Clean a raw listings CSV and load it into the database
    ///
    /// Reads the raw export, fills missing values with documented
    /// defaults, fixes up types (t/f flags, float counts), composes the
    /// review summary text, and replaces the `listings_clean` table
    /// wholesale. The indexing watermark is not touched; reset it
    /// manually if the reload changed already-indexed rows.
    Clean {
        /// Path to the raw listings CSV
        csv: PathBuf,
    },
    /// Embed and index listings past the checkpoint
    ///
    /// Fetches the next page of cleaned listings beyond the persisted
    /// watermark, synthesizes one embedding text per row, embeds the
    /// batch via the Gemini API, upserts the vectors (with the full row
    /// as payload) into Qdrant, and advances the watermark. A failed
    /// run leaves the watermark untouched so the next invocation
    /// retries the same page.
    ///
    /// Requires STAY_GEMINI_API_KEY (or gemini_api_key in the config
    /// file) and a reachable Qdrant instance.
    Index {
        /// Keep processing pages until the backlog is drained
        #[arg(long)]
        drain: bool,
    },
    /// Semantic search over the indexed listings
    Search {
        /// Free-text query
        query: String,

        /// Number of hits to return
        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },
    /// Show database, checkpoint, and backlog status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match cli.db {
        Some(db) => Config::load_with_db_path(db)?,
        None => Config::load()?,
    };

    // Ensure the data directory exists
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    match cli.command {
        Commands::Clean { csv } => {
            commands::run_clean(&config, csv)?;
        }
        Commands::Index { drain } => {
            commands::run_index(&config, drain).await?;
        }
        Commands::Search { query, top_k } => {
            commands::run_search(&config, &query, top_k).await?;
        }
        Commands::Status => {
            commands::show_status(&config)?;
        }
    }

    Ok(())
}
