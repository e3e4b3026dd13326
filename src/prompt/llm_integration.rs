use reqwest::Client;
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::tools::{ToolDescriptor, ToolInvocation};

const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid response format from LLM API: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        LlmError::Http(e.to_string())
    }
}

/// Reasoning backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAI,
    OpenRouter,
    /// Offline deterministic reasoner, no network access
    Mock,
}

impl LlmProvider {
    /// Environment variable holding the API key, if the provider needs one
    pub fn api_key_var(&self) -> Option<&'static str> {
        match self {
            LlmProvider::OpenAI => Some("OPENAI_API_KEY"),
            LlmProvider::OpenRouter => Some("OPENROUTER_API_KEY"),
            LlmProvider::Mock => None,
        }
    }

    fn default_endpoint(&self) -> &'static str {
        match self {
            LlmProvider::OpenRouter => OPENROUTER_ENDPOINT,
            LlmProvider::OpenAI | LlmProvider::Mock => OPENAI_ENDPOINT,
        }
    }
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(LlmProvider::OpenAI),
            "openrouter" => Ok(LlmProvider::OpenRouter),
            "mock" | "offline" => Ok(LlmProvider::Mock),
            other => Err(format!(
                "Unknown LLM provider '{}' (expected openai, openrouter or mock)",
                other
            )),
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmProvider::OpenAI => write!(f, "openai"),
            LlmProvider::OpenRouter => write!(f, "openrouter"),
            LlmProvider::Mock => write!(f, "mock"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub api_key: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Full chat-completions URL; overrides the provider default
    pub endpoint_url: Option<String>,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            model: "gpt-3.5-turbo".to_string(),
            api_key: String::new(),
            temperature: 0.0,
            max_tokens: 1000,
            endpoint_url: None,
            max_retries: 3,
            timeout_secs: 120,
        }
    }
}

impl LlmConfig {
    pub fn endpoint(&self) -> &str {
        self.endpoint_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_endpoint())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// One chat-completions message
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Option<String>,
    pub tool_call: Option<ToolInvocation>,
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: Role, content: &str) -> Self {
        Self {
            role,
            content: Some(content.to_string()),
            tool_call: None,
            tool_call_id: None,
        }
    }

    pub fn system(content: &str) -> Self {
        Self::text(Role::System, content)
    }

    pub fn user(content: &str) -> Self {
        Self::text(Role::User, content)
    }

    pub fn assistant(content: &str) -> Self {
        Self::text(Role::Assistant, content)
    }

    /// Assistant turn that requested a tool
    pub fn tool_request(invocation: &ToolInvocation) -> Self {
        Self {
            role: Role::Assistant,
            content: None,
            tool_call: Some(invocation.clone()),
            tool_call_id: None,
        }
    }

    /// Observation returned for a tool request
    pub fn tool_result(call_id: &str, content: &str) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.to_string()),
            tool_call: None,
            tool_call_id: Some(call_id.to_string()),
        }
    }

    pub fn to_json(&self) -> Value {
        let mut message = json!({
            "role": self.role.as_str(),
            "content": self.content,
        });

        if let Some(call) = &self.tool_call {
            // Unparseable arguments are kept as raw text and echoed back untouched
            let arguments = match &call.arguments {
                Value::String(raw) => raw.clone(),
                other => other.to_string(),
            };
            message["tool_calls"] = json!([{
                "id": call.id,
                "type": "function",
                "function": {
                    "name": call.name,
                    "arguments": arguments,
                }
            }]);
        }
        if let Some(id) = &self.tool_call_id {
            message["tool_call_id"] = json!(id);
        }

        message
    }
}

/// What the model answered with
#[derive(Debug, Clone, PartialEq)]
pub enum ChatReply {
    Content(String),
    ToolCall(ToolInvocation),
}

/// Chat-completions client with function calling and retries
pub struct LlmClient {
    config: LlmConfig,
    client: Client,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Send the conversation and return the model's reply, retrying transport and API failures
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDescriptor],
    ) -> Result<ChatReply, LlmError> {
        let body = self.request_body(messages, tools);
        let max_retries = self.config.max_retries.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!("LLM API call attempt {}/{}", attempt, max_retries);

            match self.try_complete(&body).await {
                Ok(json) => return parse_reply(&json),
                Err(e) => {
                    if attempt >= max_retries {
                        return Err(match e {
                            LlmError::Http(msg) => LlmError::Http(format!(
                                "Failed after {} attempts: {}",
                                max_retries, msg
                            )),
                            other => other,
                        });
                    }
                    // Exponential backoff
                    let backoff = Duration::from_millis(500 * 2u64.pow(attempt - 1));
                    warn!("LLM API call failed: {}. Retrying in {:?}...", e, backoff);
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    pub fn request_body(&self, messages: &[ChatMessage], tools: &[ToolDescriptor]) -> Value {
        let mut body = json!({
            "model": self.config.model,
            "messages": messages.iter().map(ChatMessage::to_json).collect::<Vec<_>>(),
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        });

        if !tools.is_empty() {
            body["tools"] = tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.json_schema(),
                        }
                    })
                })
                .collect();
            body["tool_choice"] = json!("auto");
        }

        body
    }

    async fn try_complete(&self, body: &Value) -> Result<Value, LlmError> {
        let mut request = self
            .client
            .post(self.config.endpoint())
            .header("Content-Type", "application/json")
            .json(body);

        if !self.config.api_key.is_empty() {
            request = request.bearer_auth(&self.config.api_key);
        }
        if self.config.provider == LlmProvider::OpenRouter {
            request = request.header("X-Title", "graphsemantics");
        }

        let res = request.send().await?;

        // Check for HTTP errors
        if !res.status().is_success() {
            let status = res.status();
            let error_text = res
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::Http(format!("HTTP error {}: {}", status, error_text)));
        }

        let json: Value = res.json().await?;

        if let Some(message) = json["error"]["message"].as_str() {
            return Err(LlmError::Api(message.to_string()));
        }

        Ok(json)
    }
}

/// Interpret a chat-completions response body
pub fn parse_reply(json: &Value) -> Result<ChatReply, LlmError> {
    let message = json["choices"]
        .as_array()
        .and_then(|choices| choices.first())
        .map(|choice| &choice["message"])
        .ok_or_else(|| LlmError::InvalidResponse("missing choices".to_string()))?;

    if let Some(calls) = message["tool_calls"].as_array() {
        if calls.len() > 1 {
            warn!(
                "Model requested {} tool calls at once, running only the first",
                calls.len()
            );
        }
        if let Some(call) = calls.first() {
            let id = call["id"].as_str().unwrap_or("call_0");
            return tool_call_from(id, &call["function"]);
        }
    }

    // Legacy function-calling shape
    if message["function_call"].is_object() {
        return tool_call_from("call_0", &message["function_call"]);
    }

    match message["content"].as_str() {
        Some(content) => Ok(ChatReply::Content(content.trim().to_string())),
        None => Err(LlmError::InvalidResponse(
            "message has neither content nor a tool call".to_string(),
        )),
    }
}

fn tool_call_from(id: &str, function: &Value) -> Result<ChatReply, LlmError> {
    let name = function["name"]
        .as_str()
        .ok_or_else(|| LlmError::InvalidResponse("tool call without a name".to_string()))?;

    let arguments = match &function["arguments"] {
        Value::String(raw) if raw.trim().is_empty() => json!({}),
        Value::String(raw) => serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone())),
        Value::Null => json!({}),
        other => other.clone(),
    };

    Ok(ChatReply::ToolCall(ToolInvocation::new(id, name, arguments)))
}
