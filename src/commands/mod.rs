pub mod chat;
pub mod import;
pub mod query;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use graphsemantics::agent::{reasoner_for, SemanticAgent};
use graphsemantics::config::Settings;
use graphsemantics::db::SqliteGraphStore;
use graphsemantics::tools::default_registry;

use crate::cli::ReasoningArgs;

/// Resolve settings, apply command-line overrides, and open the store
pub fn load_settings(env_file: Option<&Path>, args: &ReasoningArgs) -> Result<Settings> {
    let mut settings = Settings::from_env(env_file, args.provider.map(Into::into))
        .context("Invalid configuration")?;
    apply_overrides(&mut settings, args);
    Ok(settings)
}

/// Flags given on the command line win over the environment
fn apply_overrides(settings: &mut Settings, args: &ReasoningArgs) {
    if let Some(model) = &args.model {
        settings.llm.model = model.clone();
    }
    settings.llm.temperature = args.temperature;
    if let Some(max) = args.max_iterations {
        settings.agent.max_iterations = max.max(1);
    }
}

pub fn build_agent(settings: &Settings, store: &SqliteGraphStore) -> Result<SemanticAgent> {
    let registry = default_registry(Arc::new(store.clone()), settings.max_relationship_lines)
        .context("Failed to register tools")?;
    let reasoner = reasoner_for(&settings.llm).context("Failed to set up reasoning")?;

    info!(
        "Agent ready: provider={}, model={}, tools={:?}",
        settings.llm.provider,
        settings.llm.model,
        registry.names()
    );
    Ok(SemanticAgent::new(registry, reasoner, settings.agent.clone()))
}

pub fn open_store(settings: &Settings) -> Result<SqliteGraphStore> {
    SqliteGraphStore::connect(&settings.store)
        .with_context(|| format!("Failed to open graph store at {}", settings.store.uri))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use graphsemantics::config::{MODEL_VAR, PROVIDER_VAR};

    fn chat_args(argv: &[&str]) -> ReasoningArgs {
        match Cli::parse_from(argv).command {
            Commands::Chat { reasoning } => reasoning,
            _ => panic!("expected chat command"),
        }
    }

    fn mock_settings(model: Option<&str>) -> Settings {
        Settings::from_lookup(|key| match key {
            k if k == PROVIDER_VAR => Some("mock".to_string()),
            k if k == MODEL_VAR => model.map(str::to_string),
            _ => None,
        })
        .unwrap()
    }

    #[test]
    fn test_model_from_environment_survives_without_flag() {
        let mut settings = mock_settings(Some("gpt-4o"));
        apply_overrides(&mut settings, &chat_args(&["graphsemantics", "chat"]));
        assert_eq!(settings.llm.model, "gpt-4o");
    }

    #[test]
    fn test_model_flag_beats_environment() {
        let mut settings = mock_settings(Some("gpt-4o"));
        apply_overrides(
            &mut settings,
            &chat_args(&["graphsemantics", "chat", "--model", "gpt-4o-mini", "--max-iterations", "2"]),
        );
        assert_eq!(settings.llm.model, "gpt-4o-mini");
        assert_eq!(settings.agent.max_iterations, 2);
    }

    #[test]
    fn test_model_defaults_when_neither_is_set() {
        let mut settings = mock_settings(None);
        apply_overrides(&mut settings, &chat_args(&["graphsemantics", "chat"]));
        assert_eq!(settings.llm.model, "gpt-3.5-turbo");
    }
}
