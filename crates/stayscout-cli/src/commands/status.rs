use anyhow::Result;
use stayscout_core::{CheckpointFile, Database};
use stayscout_etl::Config;

pub fn show_status(config: &Config) -> Result<()> {
    let db = Database::open(&config.database_path)?;
    let checkpoint = CheckpointFile::new(&config.checkpoint_path);

    let total = db.count_listings()?;
    let watermark = checkpoint.load();
    let backlog = db.count_after(watermark)?;

    println!("\n📊 Stayscout Status\n");
    println!("  Database:   {}", config.database_path.display());
    println!("  Checkpoint: {}", config.checkpoint_path.display());
    println!("  Collection: {} @ {}", config.collection, config.qdrant_url);
    println!();
    println!("  Cleaned listings: {total}");
    match watermark {
        Some(id) => println!("  Watermark:        {id}"),
        None => println!("  Watermark:        (none; next run starts from the beginning)"),
    }
    println!("  Backlog:          {backlog}");

    if backlog > 0 {
        println!("\n  Run `stayscout index` to process the backlog");
    }

    Ok(())
}
