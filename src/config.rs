use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::agent::AgentConfig;
use crate::db::StoreConfig;
use crate::prompt::llm_integration::{LlmConfig, LlmProvider};
use crate::tools::information::DEFAULT_MAX_RELATIONSHIP_LINES;

pub const PROVIDER_VAR: &str = "GRAPHSEMANTICS_LLM_PROVIDER";
pub const MODEL_VAR: &str = "GRAPHSEMANTICS_LLM_MODEL";
pub const ENDPOINT_VAR: &str = "GRAPHSEMANTICS_LLM_ENDPOINT";
pub const STORE_URI_VAR: &str = "GRAPHSEMANTICS_STORE_URI";
pub const MAX_ITERATIONS_VAR: &str = "GRAPHSEMANTICS_MAX_ITERATIONS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingVariables(Vec<String>),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },

    #[error("Failed to load env file {path}: {reason}")]
    EnvFile { path: String, reason: String },
}

/// Everything needed to build the store, the reasoner and the agent
#[derive(Debug, Clone)]
pub struct Settings {
    pub llm: LlmConfig,
    pub store: StoreConfig,
    pub agent: AgentConfig,
    pub max_relationship_lines: usize,
}

impl Settings {
    /// Read settings from the process environment, after loading a `.env` file.
    /// A provider given here takes precedence over the environment.
    pub fn from_env(
        env_file: Option<&Path>,
        provider: Option<LlmProvider>,
    ) -> Result<Self, ConfigError> {
        load_env_file(env_file)?;
        Self::from_lookup(|key| match provider {
            Some(p) if key == PROVIDER_VAR => Some(p.to_string()),
            _ => std::env::var(key).ok(),
        })
    }

    /// Build settings from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let provider = match get(PROVIDER_VAR) {
            Some(raw) => raw.parse::<LlmProvider>().map_err(|reason| ConfigError::InvalidValue {
                name: PROVIDER_VAR.to_string(),
                reason,
            })?,
            None => LlmProvider::OpenAI,
        };

        let mut missing = Vec::new();
        let api_key = match provider.api_key_var() {
            Some(var) => get(var).unwrap_or_else(|| {
                missing.push(var.to_string());
                String::new()
            }),
            None => String::new(),
        };
        if !missing.is_empty() {
            return Err(ConfigError::MissingVariables(missing));
        }

        let mut llm = LlmConfig {
            provider,
            api_key,
            endpoint_url: get(ENDPOINT_VAR),
            ..Default::default()
        };
        if let Some(model) = get(MODEL_VAR) {
            llm.model = model;
        }

        let mut agent = AgentConfig::default();
        if let Some(raw) = get(MAX_ITERATIONS_VAR) {
            agent.max_iterations = match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: MAX_ITERATIONS_VAR.to_string(),
                        reason: format!("expected a positive integer, got '{}'", raw),
                    })
                }
            };
        }

        let store = match get(STORE_URI_VAR) {
            Some(uri) => StoreConfig::new(&uri),
            None => StoreConfig::default(),
        };

        debug!(
            "Loaded settings: provider={}, model={}, store={}",
            llm.provider, llm.model, store.uri
        );

        Ok(Self {
            llm,
            store,
            agent,
            max_relationship_lines: DEFAULT_MAX_RELATIONSHIP_LINES,
        })
    }
}

/// Store connection settings only; needs no reasoning credentials
pub fn store_from_env(env_file: Option<&Path>) -> Result<StoreConfig, ConfigError> {
    load_env_file(env_file)?;
    Ok(match std::env::var(STORE_URI_VAR) {
        Ok(uri) if !uri.trim().is_empty() => StoreConfig::new(uri.trim()),
        _ => StoreConfig::default(),
    })
}

fn load_env_file(env_file: Option<&Path>) -> Result<(), ConfigError> {
    match env_file {
        Some(path) => {
            dotenv::from_path(path).map_err(|e| ConfigError::EnvFile {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            debug!("Loaded environment from {}", path.display());
        }
        None => {
            // A missing default .env is fine
            if let Ok(path) = dotenv::dotenv() {
                debug!("Loaded environment from {}", path.display());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_openai_key() {
        let settings = Settings::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk-test")])).unwrap();

        assert_eq!(settings.llm.provider, LlmProvider::OpenAI);
        assert_eq!(settings.llm.model, "gpt-3.5-turbo");
        assert_eq!(settings.llm.temperature, 0.0);
        assert_eq!(settings.llm.api_key, "sk-test");
        assert_eq!(settings.store.uri, "graphsemantics.db");
        assert_eq!(settings.agent.max_iterations, 4);
    }

    #[test]
    fn test_missing_api_key_is_reported_by_name() {
        let err = Settings::from_lookup(lookup_from(&[("OPENAI_API_KEY", "  ")])).unwrap_err();
        match err {
            ConfigError::MissingVariables(vars) => assert_eq!(vars, vec!["OPENAI_API_KEY"]),
            other => panic!("unexpected error: {}", other),
        }

        let err = Settings::from_lookup(lookup_from(&[(PROVIDER_VAR, "openrouter")])).unwrap_err();
        assert!(err.to_string().contains("OPENROUTER_API_KEY"));
    }

    #[test]
    fn test_mock_provider_needs_no_key() {
        let settings = Settings::from_lookup(lookup_from(&[
            (PROVIDER_VAR, "mock"),
            (STORE_URI_VAR, "sqlite:///tmp/movies.db"),
            (MAX_ITERATIONS_VAR, "2"),
        ]))
        .unwrap();

        assert_eq!(settings.llm.provider, LlmProvider::Mock);
        assert_eq!(settings.store.database_path(), "/tmp/movies.db");
        assert_eq!(settings.agent.max_iterations, 2);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            Settings::from_lookup(lookup_from(&[(PROVIDER_VAR, "claude")])),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            Settings::from_lookup(lookup_from(&[(PROVIDER_VAR, "mock"), (MAX_ITERATIONS_VAR, "0")])),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_explicit_env_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.env");
        assert!(matches!(
            load_env_file(Some(&missing)),
            Err(ConfigError::EnvFile { .. })
        ));

        let present = dir.path().join("test.env");
        let mut file = std::fs::File::create(&present).unwrap();
        writeln!(file, "GRAPHSEMANTICS_CONFIG_TEST_MARKER=loaded").unwrap();
        load_env_file(Some(&present)).unwrap();
        assert_eq!(
            std::env::var("GRAPHSEMANTICS_CONFIG_TEST_MARKER").unwrap(),
            "loaded"
        );
    }
}
