use anyhow::{Context, Result};
use std::path::Path;

use graphsemantics::import::{import_movies, DEFAULT_SOURCE};

use super::{build_agent, load_settings, open_store};
use crate::cli::ReasoningArgs;

/// Runs the query command with the provided arguments
pub async fn run(
    env_file: Option<&Path>,
    text: &str,
    args: &ReasoningArgs,
    import_data: bool,
) -> Result<()> {
    let settings = load_settings(env_file, args)?;
    let store = open_store(&settings)?;

    if import_data {
        let summary = import_movies(&store, DEFAULT_SOURCE)
            .await
            .context("Failed to import movie data")?;
        eprintln!("Imported {}", summary);
    }

    let agent = build_agent(&settings, &store)?;
    let answer = agent.query(text, &[]).await?;

    println!("{}", answer);
    Ok(())
}
