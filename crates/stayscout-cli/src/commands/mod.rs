pub mod clean;
pub mod index;
pub mod search;
pub mod status;

pub use clean::run_clean;
pub use index::run_index;
pub use search::run_search;
pub use status::show_status;

use anyhow::{Context, Result};
use stayscout_etl::{Config, GeminiClient, QdrantClient};

/// Build the Gemini embedding client from config.
pub(crate) fn gemini_client(config: &Config) -> Result<GeminiClient> {
    let api_key = config
        .gemini_api_key
        .as_deref()
        .context("Gemini API key not set (STAY_GEMINI_API_KEY or gemini_api_key in config)")?;
    Ok(GeminiClient::new(api_key, config.embed_model.as_str())?)
}

/// Build the Qdrant client from config.
pub(crate) fn qdrant_client(config: &Config) -> Result<QdrantClient> {
    Ok(QdrantClient::new(
        config.qdrant_url.as_str(),
        config.qdrant_api_key.clone(),
        config.collection.as_str(),
    )?)
}
