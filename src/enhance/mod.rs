pub mod prompt;
pub mod provider;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::EnhancementError;
use crate::schema::{self, DocumentRecord, Field};
pub use provider::{
    AnthropicProvider, ApiKey, CompletionRequest, Credentials, OpenAiProvider,
    TextCompletionProvider,
};

/// Pass-through knobs for one enhancement call.
#[derive(Debug, Clone)]
pub struct EnhancementOptions {
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub timeout: Duration,
    pub max_input_chars: usize,
}

/// Asks a completion provider to improve a baseline record and returns a
/// validated candidate. Every failure is an `EnhancementError` value.
#[derive(Clone)]
pub struct Enhancer {
    provider: Arc<dyn TextCompletionProvider>,
    options: EnhancementOptions,
}

impl fmt::Debug for Enhancer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Enhancer")
            .field("provider", &self.provider.name())
            .field("options", &self.options)
            .finish()
    }
}

impl Enhancer {
    pub fn new(provider: Arc<dyn TextCompletionProvider>, options: EnhancementOptions) -> Self {
        Enhancer { provider, options }
    }

    pub async fn enhance(
        &self,
        text: &str,
        baseline: &DocumentRecord,
        credentials: &Credentials,
    ) -> Result<DocumentRecord, EnhancementError> {
        let api_key = credentials
            .api_key
            .as_ref()
            .ok_or_else(|| EnhancementError::MissingCredentials(credentials.source.clone()))?;

        let prompt = prompt::build_prompt(text, baseline, self.options.max_input_chars);
        let request = CompletionRequest {
            system: prompt::SYSTEM_PROMPT,
            prompt: &prompt,
            model: &self.options.model,
            temperature: self.options.temperature,
            max_output_tokens: self.options.max_output_tokens,
            api_key,
        };

        debug!(
            provider = self.provider.name(),
            model = %self.options.model,
            prompt_chars = prompt.len(),
            "requesting enhancement"
        );
        let reply = tokio::time::timeout(self.options.timeout, self.provider.complete(&request))
            .await
            .map_err(|_| EnhancementError::Timeout(self.options.timeout))??;

        let candidate = parse_reply(&reply)?;
        let candidate = sanitize(candidate, baseline);
        Ok(schema::validate(&candidate)?)
    }
}

/// The JSON object between the first `{` and the last `}` of the reply.
fn parse_reply(reply: &str) -> Result<Map<String, Value>, EnhancementError> {
    let (start, end) = match (reply.find('{'), reply.rfind('}')) {
        (Some(s), Some(e)) if s < e => (s, e),
        _ => {
            return Err(EnhancementError::Malformed(
                "no JSON object in reply".to_string(),
            ))
        }
    };
    match serde_json::from_str::<Value>(&reply[start..=end]) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(EnhancementError::Malformed("reply is not a JSON object".to_string())),
        Err(e) => Err(EnhancementError::Malformed(e.to_string())),
    }
}

/// Drop keys outside the schema, treat blank and "null" strings as null, and
/// seed required fields the model left empty from the baseline.
fn sanitize(candidate: Map<String, Value>, baseline: &DocumentRecord) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in candidate {
        let Some(field) = Field::from_key(&key) else {
            warn!(key = %key, "dropping key outside the schema");
            continue;
        };
        let value = match value {
            Value::String(s) if s.trim().is_empty() || s.trim().eq_ignore_ascii_case("null") => {
                Value::Null
            }
            other => other,
        };
        out.insert(field.key().to_string(), value);
    }

    for field in Field::ALL.into_iter().filter(|f| f.is_required()) {
        let missing = out.get(field.key()).map_or(true, Value::is_null);
        if missing {
            if let Some(seed) = baseline.get(field) {
                out.insert(field.key().to_string(), Value::String(seed.to_string()));
            }
        }
    }
    out
}

// ── Tests ──
