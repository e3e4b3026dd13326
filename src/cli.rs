use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use graphsemantics::prompt::LlmProvider;

/// GraphSemantics: ask questions about a movie graph in plain language
#[derive(Parser)]
#[command(
    author,
    version,
    about = "Natural-language questions over a movie property graph"
)]
pub struct Cli {
    /// Load environment variables from this file instead of ./.env
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import the movie dataset into the graph store
    Import {
        /// CSV file path or http(s) URL (defaults to the public movie dataset)
        #[arg(long, short)]
        source: Option<String>,
    },

    /// Answer a single question
    Query {
        /// Question in natural language (e.g., "Who played in Casino?")
        text: String,

        #[command(flatten)]
        reasoning: ReasoningArgs,

        /// Import the movie dataset before answering
        #[arg(long)]
        import_data: bool,
    },

    /// Interactive conversation that remembers earlier turns
    Chat {
        #[command(flatten)]
        reasoning: ReasoningArgs,
    },
}

#[derive(clap::Args, Clone, Debug)]
pub struct ReasoningArgs {
    /// Model used for reasoning (overrides GRAPHSEMANTICS_LLM_MODEL, default gpt-3.5-turbo)
    #[arg(long, short)]
    pub model: Option<String>,

    /// Sampling temperature for reasoning
    #[arg(long, short, default_value_t = 0.0)]
    pub temperature: f32,

    /// Maximum tool-invocation rounds per question
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Reasoning backend (overrides GRAPHSEMANTICS_LLM_PROVIDER)
    #[arg(long, short)]
    pub provider: Option<ProviderArg>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ProviderArg {
    /// OpenAI chat completions
    Openai,

    /// OpenRouter chat completions
    Openrouter,

    /// Offline heuristic reasoning, no API key needed
    Mock,
}

impl From<ProviderArg> for LlmProvider {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Openai => LlmProvider::OpenAI,
            ProviderArg::Openrouter => LlmProvider::OpenRouter,
            ProviderArg::Mock => LlmProvider::Mock,
        }
    }
}
