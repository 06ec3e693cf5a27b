use anyhow::Result;
use stayscout_core::{CheckpointFile, Database};
use stayscout_etl::{Config, Indexer, IndexerOpts, RunOutcome};

use super::{gemini_client, qdrant_client};

pub async fn run_index(config: &Config, drain: bool) -> Result<()> {
    let db = Database::open(&config.database_path)?;
    let checkpoint = CheckpointFile::new(&config.checkpoint_path);
    let embedder = gemini_client(config)?;
    let index = qdrant_client(config)?;

    let opts = IndexerOpts {
        page_size: config.page_size,
        embed_batch_size: config.embed_batch_size,
        upsert_batch_size: config.upsert_batch_size,
    };
    let indexer = Indexer::new(&db, &checkpoint, &embedder, &index, opts);

    if drain {
        let total = indexer.run_to_completion().await?;
        if total == 0 {
            println!("\n✓ Nothing to index; backlog is empty");
        } else {
            println!("\n✓ Indexed {total} listings; backlog drained");
        }
        return Ok(());
    }

    match indexer.run_once().await? {
        RunOutcome::Processed { rows, last_seen_id } => {
            println!("\n✓ Indexed {rows} listings (watermark now {last_seen_id})");
            let remaining = db.count_after(Some(last_seen_id))?;
            if remaining > 0 {
                println!("  {remaining} listings remaining; run again to continue");
            }
        }
        RunOutcome::Drained => {
            println!("\n✓ Nothing to index; backlog is empty");
        }
    }
    Ok(())
}
