// Expose modules as public for use by other crates
pub mod agent;
pub mod config;
pub mod db;
pub mod graph;
pub mod import;
pub mod prompt;
pub mod tools;

#[cfg(test)]
mod test_support;

// Re-export core types for convenience
pub use agent::{AgentConfig, OrchestrationError, SemanticAgent, Turn};
pub use graph::entity;
pub use graph::relationship;
