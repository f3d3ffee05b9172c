use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EnhancementError;

/// Opaque provider credential. Never printed.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        ApiKey(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Where the key came from, and the key if it was there.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub source: String,
    pub api_key: Option<ApiKey>,
}

impl Credentials {
    pub fn from_env(var: &str) -> Self {
        let api_key = std::env::var(var)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(ApiKey::new);
        Credentials {
            source: var.to_string(),
            api_key,
        }
    }
}

#[derive(Debug)]
pub struct CompletionRequest<'a> {
    pub system: &'a str,
    pub prompt: &'a str,
    pub model: &'a str,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub api_key: &'a ApiKey,
}

/// A text-completion service: prompt in, text out.
#[async_trait]
pub trait TextCompletionProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, EnhancementError>;
}

// ── OpenAI chat completions ──

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(base_url: Option<String>) -> Self {
        OpenAiProvider {
            client: reqwest::Client::new(),
            base_url: base_url.unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

fn parse_openai_body(body: &str) -> Result<String, EnhancementError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| EnhancementError::Malformed(format!("unexpected OpenAI payload: {}", e)))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| EnhancementError::Malformed("OpenAI returned no choices".to_string()))
}

#[async_trait]
impl TextCompletionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, EnhancementError> {
        let body = ChatRequest {
            model: request.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: request.system,
                },
                ChatMessage {
                    role: "user",
                    content: request.prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_output_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", request.api_key.expose()))
            .json(&body)
            .send()
            .await
            .map_err(|e| EnhancementError::Unreachable(e.to_string()))?;

        let text = read_body(response).await?;
        parse_openai_body(&text)
    }
}

// ── Anthropic messages ──

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    client: reqwest::Client,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(base_url: Option<String>) -> Self {
        AnthropicProvider {
            client: reqwest::Client::new(),
            base_url: base_url.unwrap_or_else(|| ANTHROPIC_BASE_URL.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

fn parse_anthropic_body(body: &str) -> Result<String, EnhancementError> {
    let parsed: MessagesResponse = serde_json::from_str(body)
        .map_err(|e| EnhancementError::Malformed(format!("unexpected Anthropic payload: {}", e)))?;
    let text: String = parsed.content.into_iter().filter_map(|b| b.text).collect();
    if text.is_empty() {
        return Err(EnhancementError::Malformed(
            "Anthropic returned no text content".to_string(),
        ));
    }
    Ok(text)
}

#[async_trait]
impl TextCompletionProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, EnhancementError> {
        let body = MessagesRequest {
            model: request.model,
            max_tokens: request.max_output_tokens,
            temperature: request.temperature,
            system: request.system,
            messages: vec![ChatMessage {
                role: "user",
                content: request.prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", request.api_key.expose())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| EnhancementError::Unreachable(e.to_string()))?;

        let text = read_body(response).await?;
        parse_anthropic_body(&text)
    }
}

async fn read_body(response: reqwest::Response) -> Result<String, EnhancementError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| EnhancementError::Unreachable(e.to_string()))?;
    if !status.is_success() {
        return Err(EnhancementError::Provider {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

// ── Tests ──
