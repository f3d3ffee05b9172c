use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::enhance::{
    AnthropicProvider, Credentials, EnhancementOptions, Enhancer, OpenAiProvider,
    TextCompletionProvider,
};
use crate::pipeline::Pipeline;

pub const ENV_PREFIX: &str = "PAPER_EXTRACT";
pub const DEFAULT_CONFIG_NAME: &str = "paper_extract";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Openai,
    Anthropic,
}

impl ProviderKind {
    pub fn default_model(self) -> &'static str {
        match self {
            ProviderKind::Openai => "gpt-3.5-turbo",
            ProviderKind::Anthropic => "claude-3-haiku-20240307",
        }
    }

    pub fn default_key_env(self) -> &'static str {
        match self {
            ProviderKind::Openai => "OPENAI_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

/// Runtime settings. Layered: built-in defaults, then the config file, then
/// `PAPER_EXTRACT_*` environment variables. CLI flags are applied on top by
/// the binary.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub enhance: bool,
    pub provider: ProviderKind,
    pub model: Option<String>,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub timeout_secs: u64,
    pub max_input_chars: usize,
    pub base_url: Option<String>,
    pub api_key_env: Option<String>,
}

impl Settings {
    /// An explicit `path` must exist; otherwise `paper_extract.toml` in the
    /// working directory is read if present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) => File::from(p),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };
        Config::builder()
            .set_default("enhance", false)?
            .set_default("provider", "openai")?
            .set_default("temperature", 0.1)?
            .set_default("max_output_tokens", 4000_i64)?
            .set_default("timeout_secs", 60_i64)?
            .set_default("max_input_chars", 12000_i64)?
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    pub fn key_env(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.provider.default_key_env())
    }

    pub fn options(&self) -> EnhancementOptions {
        EnhancementOptions {
            model: self.model().to_string(),
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
            timeout: Duration::from_secs(self.timeout_secs),
            max_input_chars: self.max_input_chars,
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::from_env(self.key_env())
    }

    pub fn provider(&self) -> Arc<dyn TextCompletionProvider> {
        match self.provider {
            ProviderKind::Openai => Arc::new(OpenAiProvider::new(self.base_url.clone())),
            ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(self.base_url.clone())),
        }
    }

    pub fn pipeline(&self) -> Pipeline {
        if !self.enhance {
            return Pipeline::baseline_only();
        }
        let enhancer = Enhancer::new(self.provider(), self.options());
        Pipeline::with_enhancement(enhancer, self.credentials())
    }
}

// ── Tests ──
