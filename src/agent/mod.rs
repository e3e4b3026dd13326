pub mod heuristic;
pub mod orchestrator;
pub mod reasoner;

#[cfg(test)]
mod tests;

pub use heuristic::HeuristicReasoner;
pub use orchestrator::{
    AgentConfig, AgentStep, OrchestrationError, SemanticAgent, Turn, DEFAULT_MAX_ITERATIONS,
};
pub use reasoner::{reasoner_for, Decision, LlmReasoner, Reasoner, ReasoningError, ReasoningRequest};
