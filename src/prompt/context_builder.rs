use indoc::indoc;

use crate::agent::{AgentStep, Turn};

use super::llm_integration::ChatMessage;

/// Default behavioural instruction for the movie assistant
pub const SYSTEM_INSTRUCTION: &str = indoc! {"
    You are a helpful assistant that finds information about movies and recommends them.
    If tools require follow up questions, make sure to ask the user for clarification.
    Make sure to include any available options that need to be clarified in the follow up questions.
    Do only the things the user specifically requested."};

/// Reasoning context in order: instruction, prior turns, the new utterance, then
/// every tool request and its observation from the current query
pub fn build_messages(
    instruction: &str,
    history: &[Turn],
    utterance: &str,
    steps: &[AgentStep],
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(2 + history.len() * 2 + steps.len() * 2);
    messages.push(ChatMessage::system(instruction));

    for turn in history {
        messages.push(ChatMessage::user(&turn.user));
        messages.push(ChatMessage::assistant(&turn.assistant));
    }

    messages.push(ChatMessage::user(utterance));

    for step in steps {
        messages.push(ChatMessage::tool_request(&step.invocation));
        messages.push(ChatMessage::tool_result(
            &step.invocation.id,
            &step.observation,
        ));
    }

    messages
}
