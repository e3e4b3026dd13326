use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::prompt::context_builder::build_messages;
use crate::prompt::llm_integration::{ChatReply, LlmClient, LlmConfig, LlmError, LlmProvider};
use crate::tools::{ToolDescriptor, ToolInvocation};

use super::heuristic::HeuristicReasoner;
use super::orchestrator::{AgentStep, Turn};

#[derive(Debug, Error)]
pub enum ReasoningError {
    #[error("Reasoning service unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid reasoning response: {0}")]
    InvalidResponse(String),
}

impl From<LlmError> for ReasoningError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::InvalidResponse(msg) => ReasoningError::InvalidResponse(msg),
            other => ReasoningError::Unavailable(other.to_string()),
        }
    }
}

/// What the reasoning step wants to do next
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Answer the user and stop
    Final(String),
    /// Run one registered tool and report back
    Invoke(ToolInvocation),
}

/// Everything the reasoning step sees for one decision
#[derive(Debug, Clone, Copy)]
pub struct ReasoningRequest<'a> {
    pub instruction: &'a str,
    pub tools: &'a [ToolDescriptor],
    pub history: &'a [Turn],
    pub utterance: &'a str,
    pub steps: &'a [AgentStep],
}

#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn decide(&self, request: &ReasoningRequest<'_>) -> Result<Decision, ReasoningError>;
}

/// Reasoning backed by a chat-completions model with function calling
pub struct LlmReasoner {
    client: LlmClient,
}

impl LlmReasoner {
    pub fn new(config: LlmConfig) -> Result<Self, ReasoningError> {
        Ok(Self {
            client: LlmClient::new(config)?,
        })
    }
}

#[async_trait]
impl Reasoner for LlmReasoner {
    async fn decide(&self, request: &ReasoningRequest<'_>) -> Result<Decision, ReasoningError> {
        let messages = build_messages(
            request.instruction,
            request.history,
            request.utterance,
            request.steps,
        );
        debug!(
            "Sending {} messages to {}",
            messages.len(),
            self.client.config().model
        );

        match self.client.complete(&messages, request.tools).await? {
            ChatReply::Content(answer) => Ok(Decision::Final(answer)),
            ChatReply::ToolCall(invocation) => Ok(Decision::Invoke(invocation)),
        }
    }
}

/// Pick the reasoning backend for the configured provider
pub fn reasoner_for(config: &LlmConfig) -> Result<Arc<dyn Reasoner>, ReasoningError> {
    match config.provider {
        LlmProvider::Mock => Ok(Arc::new(HeuristicReasoner::new())),
        LlmProvider::OpenAI | LlmProvider::OpenRouter => {
            Ok(Arc::new(LlmReasoner::new(config.clone())?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_errors_map_to_reasoning_errors() {
        assert!(matches!(
            ReasoningError::from(LlmError::Http("timeout".to_string())),
            ReasoningError::Unavailable(_)
        ));
        assert!(matches!(
            ReasoningError::from(LlmError::Api("rate limited".to_string())),
            ReasoningError::Unavailable(_)
        ));
        assert!(matches!(
            ReasoningError::from(LlmError::InvalidResponse("no choices".to_string())),
            ReasoningError::InvalidResponse(_)
        ));
    }

    #[tokio::test]
    async fn test_llm_reasoner_unreachable_endpoint_is_unavailable() {
        let reasoner = LlmReasoner::new(LlmConfig {
            endpoint_url: Some("http://127.0.0.1:9/v1/chat/completions".to_string()),
            max_retries: 1,
            timeout_secs: 5,
            ..Default::default()
        })
        .unwrap();

        let request = ReasoningRequest {
            instruction: "be brief",
            tools: &[],
            history: &[],
            utterance: "hi",
            steps: &[],
        };

        let result = reasoner.decide(&request).await;
        assert!(matches!(result, Err(ReasoningError::Unavailable(_))));
    }
}
