pub mod context_builder;
pub mod llm_integration;

pub use context_builder::{build_messages, SYSTEM_INSTRUCTION};
pub use llm_integration::{ChatMessage, ChatReply, LlmClient, LlmConfig, LlmError, LlmProvider};
