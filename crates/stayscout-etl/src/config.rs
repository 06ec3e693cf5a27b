use anyhow::{Context, Result};
use confyg::{env, Confygery};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for stayscout.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (STAY_* prefix)
/// 3. Config file (~/.config/stayscout/config.toml)
/// 4. Built-in defaults (lowest priority)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the SQLite database holding cleaned listings.
    ///
    /// Can be set via:
    /// - CLI: --db /path/to/db
    /// - ENV: STAY_DATABASE_PATH
    /// - Default: ~/.local/share/stayscout/stayscout.db
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,

    /// Path to the watermark checkpoint file.
    ///
    /// Default: ~/.local/share/stayscout/.progress.json
    #[serde(default = "default_checkpoint_path")]
    pub checkpoint_path: PathBuf,

    /// Gemini API key for the embedding service.
    ///
    /// - ENV: STAY_GEMINI_API_KEY
    pub gemini_api_key: Option<String>,

    /// Embedding model identifier.
    #[serde(default = "default_embed_model")]
    pub embed_model: String,

    /// Base URL of the Qdrant instance.
    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,

    /// Optional Qdrant API key (required for Qdrant Cloud).
    pub qdrant_api_key: Option<String>,

    /// Target collection name in the vector index.
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Rows fetched from the database per pipeline run.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Texts sent to the embedding service per request.
    #[serde(default = "default_embed_batch_size")]
    pub embed_batch_size: usize,

    /// Points sent to the vector index per upsert request.
    /// Independent of the embedding sub-batch size.
    #[serde(default = "default_upsert_batch_size")]
    pub upsert_batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_db_path(),
            checkpoint_path: default_checkpoint_path(),
            gemini_api_key: None,
            embed_model: default_embed_model(),
            qdrant_url: default_qdrant_url(),
            qdrant_api_key: None,
            collection: default_collection(),
            page_size: default_page_size(),
            embed_batch_size: default_embed_batch_size(),
            upsert_batch_size: default_upsert_batch_size(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Searches for config file at: ~/.config/stayscout/config.toml
    /// Reads environment variables with STAY_ prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_path = config_file_path();

        let mut builder = Confygery::new().context("Failed to create config builder")?;

        if config_path.exists() {
            let path_str = config_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder
                .add_file(path_str)
                .context("Failed to load config file")?;
        }

        let env_opts = env::Options::with_top_level("stay");
        builder
            .add_env(env_opts)
            .context("Failed to load environment variables")?;

        let config: Self = builder.build().context("Failed to build configuration")?;

        Ok(config)
    }

    /// Load configuration with a custom database path.
    ///
    /// This is used when the --db CLI flag is provided.
    pub fn load_with_db_path(db_path: PathBuf) -> Result<Self> {
        let mut config = Self::load()?;
        config.database_path = db_path;
        Ok(config)
    }
}

/// Get the default database path.
fn default_db_path() -> PathBuf {
    data_dir().join("stayscout.db")
}

/// Get the default checkpoint path.
fn default_checkpoint_path() -> PathBuf {
    data_dir().join(".progress.json")
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stayscout")
}

fn default_embed_model() -> String {
    "text-embedding-004".to_string()
}

fn default_qdrant_url() -> String {
    "http://localhost:6333".to_string()
}

fn default_collection() -> String {
    "listings_embeddings".to_string()
}

const fn default_page_size() -> u32 {
    100
}

const fn default_embed_batch_size() -> usize {
    100
}

const fn default_upsert_batch_size() -> usize {
    250
}

/// Get the config file path.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stayscout")
        .join("config.toml")
}
