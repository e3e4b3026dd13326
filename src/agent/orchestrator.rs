use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::prompt::context_builder::SYSTEM_INSTRUCTION;
use crate::tools::{ToolError, ToolInvocation, ToolRegistry};

use super::reasoner::{Decision, Reasoner, ReasoningError, ReasoningRequest};

/// Default cap on tool-invocation rounds per query
pub const DEFAULT_MAX_ITERATIONS: usize = 4;

/// One exchange of the conversation, oldest first in a history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub user: String,
    pub assistant: String,
}

impl Turn {
    pub fn new(user: impl Into<String>, assistant: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            assistant: assistant.into(),
        }
    }
}

/// A tool request made during the current query and what it returned
#[derive(Debug, Clone, PartialEq)]
pub struct AgentStep {
    pub invocation: ToolInvocation,
    pub observation: String,
}

#[derive(Debug, Error)]
#[error("Orchestration failed: {reason}")]
pub struct OrchestrationError {
    pub reason: String,
}

impl OrchestrationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl From<ReasoningError> for OrchestrationError {
    fn from(e: ReasoningError) -> Self {
        Self::new(e.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub max_iterations: usize,
    pub system_instruction: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
        }
    }
}

/// Answers questions by letting the reasoner call registered tools.
///
/// Holds no conversation state: every call gets the full history and the
/// caller appends the resulting turn itself.
pub struct SemanticAgent {
    registry: ToolRegistry,
    reasoner: Arc<dyn Reasoner>,
    config: AgentConfig,
}

impl std::fmt::Debug for SemanticAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticAgent")
            .field("registry", &self.registry)
            .field("max_iterations", &self.config.max_iterations)
            .finish()
    }
}

impl SemanticAgent {
    pub fn new(registry: ToolRegistry, reasoner: Arc<dyn Reasoner>, mut config: AgentConfig) -> Self {
        config.max_iterations = config.max_iterations.max(1);
        Self {
            registry,
            reasoner,
            config,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Answer one utterance given the prior turns
    pub async fn query(&self, utterance: &str, history: &[Turn]) -> Result<String, OrchestrationError> {
        let utterance = utterance.trim();
        if utterance.is_empty() {
            return Err(OrchestrationError::new("Utterance must not be empty"));
        }

        info!(
            "Answering query with {} prior turns: {}",
            history.len(),
            utterance
        );
        let mut steps: Vec<AgentStep> = Vec::new();

        for round in 1..=self.config.max_iterations {
            let request = ReasoningRequest {
                instruction: &self.config.system_instruction,
                tools: self.registry.descriptors(),
                history,
                utterance,
                steps: &steps,
            };

            let decision = self.reasoner.decide(&request).await.map_err(|e| {
                warn!("Reasoning failed in round {}: {}", round, e);
                OrchestrationError::from(e)
            })?;

            match decision {
                Decision::Final(answer) => {
                    info!("Final answer after {} tool rounds", steps.len());
                    return Ok(answer);
                }
                Decision::Invoke(invocation) => {
                    info!("Round {}: invoking tool '{}'", round, invocation.name);
                    let observation = self.dispatch(&invocation).await;
                    steps.push(AgentStep {
                        invocation,
                        observation,
                    });
                }
            }
        }

        warn!(
            "Stopped after {} tool rounds without a final answer",
            self.config.max_iterations
        );
        Ok(best_effort_answer(&steps))
    }

    /// Run a requested tool; every failure becomes an observation
    async fn dispatch(&self, invocation: &ToolInvocation) -> String {
        match self
            .registry
            .invoke(&invocation.name, &invocation.arguments)
            .await
        {
            Ok(observation) => {
                debug!(
                    "Tool '{}' returned {} bytes",
                    invocation.name,
                    observation.len()
                );
                observation
            }
            Err(e) => {
                warn!("Tool '{}' failed: {}", invocation.name, e);
                self.observation_for_error(&e)
            }
        }
    }

    fn observation_for_error(&self, error: &ToolError) -> String {
        match error {
            ToolError::UnknownTool(_) => format!(
                "Error: {}. Available tools: {}",
                error,
                self.registry.names().join(", ")
            ),
            other => format!("Error: {}", other),
        }
    }
}

fn best_effort_answer(steps: &[AgentStep]) -> String {
    let found: Vec<&str> = steps
        .iter()
        .map(|s| s.observation.as_str())
        .filter(|o| !o.starts_with("Error:"))
        .collect();

    if found.is_empty() {
        return "I could not find an answer to that question.".to_string();
    }

    format!(
        "I could not reach a complete answer. Here is what I found:\n\n{}",
        found.join("\n\n")
    )
}
