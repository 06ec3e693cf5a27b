use anyhow::Result;
use std::path::PathBuf;
use stayscout_core::Database;
use stayscout_etl::{clean::load_csv, Config};

pub fn run_clean(config: &Config, csv: PathBuf) -> Result<()> {
    log::info!("Cleaning {}", csv.display());

    let mut db = Database::open(&config.database_path)?;
    let loaded = load_csv(&mut db, &csv)?;

    println!("\n✓ Loaded {loaded} cleaned listings");
    println!("  Database: {}", config.database_path.display());
    Ok(())
}
