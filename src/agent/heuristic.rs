use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::tools::{ParameterKind, ToolDescriptor, ToolInvocation};

use super::orchestrator::{AgentStep, Turn};
use super::reasoner::{Decision, Reasoner, ReasoningError, ReasoningRequest};

static QUOTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"["“”]([^"“”]+)["“”]"#).expect("quoted-text pattern is valid")
});

/// Words that never open an entity name
const LEADING_WORDS: &[&str] = &[
    "who", "what", "when", "where", "which", "why", "how", "is", "are", "was", "were", "did",
    "does", "do", "can", "could", "would", "should", "tell", "show", "give", "list", "find",
    "recommend", "please", "i", "hi", "hello", "hey", "thanks",
];

/// Lowercase words allowed inside a capitalized name
const CONNECTORS: &[&str] = &["of", "the", "and", "de", "von"];

const CLARIFICATION: &str = "Which movie or person would you like to know about? \
    Please give the exact title or full name.";

/// Offline reasoning: look up the most likely entity once, then answer from what came back
#[derive(Debug, Default, Clone)]
pub struct HeuristicReasoner;

impl HeuristicReasoner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Reasoner for HeuristicReasoner {
    async fn decide(&self, request: &ReasoningRequest<'_>) -> Result<Decision, ReasoningError> {
        if !request.steps.is_empty() {
            return Ok(Decision::Final(answer_from(request.steps)));
        }

        let Some((tool, parameter)) = lookup_target(request.tools) else {
            return Ok(Decision::Final(
                "I have no way to look that up right now.".to_string(),
            ));
        };

        match entity_candidate(request.utterance, request.history) {
            Some(candidate) => {
                let mut arguments = Map::new();
                arguments.insert(parameter.to_string(), Value::String(candidate));
                Ok(Decision::Invoke(ToolInvocation::new(
                    "call_0",
                    tool.name.clone(),
                    Value::Object(arguments),
                )))
            }
            None => Ok(Decision::Final(CLARIFICATION.to_string())),
        }
    }
}

/// First tool taking exactly one required string, with that parameter's name
fn lookup_target(tools: &[ToolDescriptor]) -> Option<(&ToolDescriptor, &str)> {
    tools.iter().find_map(|tool| {
        let mut required = tool.parameters.iter().filter(|p| p.required);
        match (required.next(), required.next()) {
            (Some(p), None) if p.kind == ParameterKind::String => Some((tool, p.name.as_str())),
            _ => None,
        }
    })
}

/// Entity named in the utterance, else in earlier user turns (newest first)
pub fn entity_candidate(utterance: &str, history: &[Turn]) -> Option<String> {
    extract_candidate(utterance).or_else(|| {
        history
            .iter()
            .rev()
            .find_map(|turn| extract_candidate(&turn.user))
    })
}

/// Quoted text wins, otherwise the longest run of capitalized words
pub fn extract_candidate(text: &str) -> Option<String> {
    if let Some(quoted) = QUOTED
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
    {
        return Some(quoted.to_string());
    }

    let mut best: Option<String> = None;
    for run in capitalized_runs(text) {
        if best.as_ref().map_or(true, |b| run.len() > b.len()) {
            best = Some(run);
        }
    }
    best
}

fn capitalized_runs(text: &str) -> Vec<String> {
    let mut runs = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut pending: Vec<&str> = Vec::new();

    for raw in text.split_whitespace() {
        let word = clean_word(raw);
        let ends_clause = raw.ends_with(['.', '?', '!', ',', ';', ':']);

        if word.is_empty() {
            flush(&mut current, &mut pending, &mut runs);
            continue;
        }

        if word.chars().next().map_or(false, char::is_uppercase) {
            let leading = current.is_empty() && LEADING_WORDS.contains(&word.to_lowercase().as_str());
            if !leading {
                current.append(&mut pending);
                current.push(word);
            }
        } else if !current.is_empty() && CONNECTORS.contains(&word.to_lowercase().as_str()) {
            pending.push(word);
        } else {
            flush(&mut current, &mut pending, &mut runs);
        }

        if ends_clause {
            flush(&mut current, &mut pending, &mut runs);
        }
    }
    flush(&mut current, &mut pending, &mut runs);

    runs
}

fn flush(current: &mut Vec<&str>, pending: &mut Vec<&str>, runs: &mut Vec<String>) {
    pending.clear();
    if !current.is_empty() {
        runs.push(current.join(" "));
        current.clear();
    }
}

/// Strip surrounding punctuation and a possessive suffix
fn clean_word(raw: &str) -> &str {
    let word = raw.trim_matches(|c: char| !c.is_alphanumeric());
    word.strip_suffix("'s")
        .or_else(|| word.strip_suffix("’s"))
        .unwrap_or(word)
}

fn answer_from(steps: &[AgentStep]) -> String {
    let last = steps
        .last()
        .map(|s| s.observation.as_str())
        .unwrap_or_default();

    if last.starts_with("No information found") {
        return format!(
            "{} Could you check the spelling or give the full title or name?",
            last
        );
    }
    if last.starts_with("Error:") {
        return format!("I could not complete the lookup. {}", last);
    }

    let observations = steps
        .iter()
        .map(|s| s.observation.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("Here is what I found in the movie database:\n\n{}", observations)
}
