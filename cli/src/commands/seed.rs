use crate::utils::settings::LoadedSettings;
use anyhow::{Context, Result};
use colored::*;
use database::{initialize_database, AuthResourceStore, DatabaseConfig};
use std::path::Path;

/// Load a `{"<collection>": [<document>, ...]}` file into the database
pub async fn execute(loaded: &LoadedSettings, file: &Path) -> Result<()> {
    let db = initialize_database(DatabaseConfig::new_with_path(loaded.database_path.clone()))
        .await
        .context("Failed to open the resource database")?;
    let store = AuthResourceStore::new(db);

    let total = store
        .load_seed_file(file)
        .await
        .with_context(|| format!("Failed to load seed file {}", file.display()))?;

    println!(
        "{} Loaded {} documents into {}",
        "✓".green(),
        total,
        loaded.database_path.display()
    );
    Ok(())
}
