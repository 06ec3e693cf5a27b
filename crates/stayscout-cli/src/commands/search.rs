use anyhow::Result;
use stayscout_etl::Config;
use stayscout_search::search;

use super::{gemini_client, qdrant_client};

pub async fn run_search(config: &Config, query: &str, top_k: usize) -> Result<()> {
    let embedder = gemini_client(config)?;
    let index = qdrant_client(config)?;

    let hits = search(&embedder, &index, query, top_k).await?;

    if hits.is_empty() {
        println!("\nNo matches in collection '{}'", config.collection);
        return Ok(());
    }

    println!("\n🔍 Top {} matches for \"{query}\"\n", hits.len());
    for hit in &hits {
        println!("{hit}\n");
    }
    Ok(())
}
