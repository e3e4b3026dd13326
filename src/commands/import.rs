use anyhow::{Context, Result};
use std::path::Path;

use graphsemantics::config::store_from_env;
use graphsemantics::db::SqliteGraphStore;
use graphsemantics::import::{import_movies, DEFAULT_SOURCE};

/// Runs the import command with the provided arguments
pub async fn run(env_file: Option<&Path>, source: Option<&str>) -> Result<()> {
    let config = store_from_env(env_file).context("Invalid configuration")?;
    let store = SqliteGraphStore::connect(&config)
        .with_context(|| format!("Failed to open graph store at {}", config.uri))?;

    let source = source.unwrap_or(DEFAULT_SOURCE);
    tracing::info!("Importing movie data from {}", source);

    let summary = import_movies(&store, source)
        .await
        .with_context(|| format!("Import from {} failed", source))?;

    println!("Imported {}", summary);
    Ok(())
}
