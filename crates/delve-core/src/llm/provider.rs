use std::time::Duration;

use super::{LLMError, OpenAIClient, LLM};
use crate::config::{LLMConfig, DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL, DEFAULT_OPENAI_URL};

/// LLM Provider configuration.
#[derive(Debug, Clone)]
pub enum Provider {
    /// Local Ollama instance (default)
    Ollama {
        base_url: Option<String>,
        model: String,
    },
    /// OpenAI or any OpenAI-compatible endpoint
    OpenAI {
        base_url: Option<String>,
        api_key: Option<String>,
        model: Option<String>,
    },
}

impl Default for Provider {
    fn default() -> Self {
        Provider::Ollama {
            base_url: None,
            model: DEFAULT_OLLAMA_MODEL.to_string(),
        }
    }
}

impl Provider {
    /// Creates a provider from LLMConfig.
    pub fn from_config(config: &LLMConfig) -> Result<Self, LLMError> {
        match config.provider.as_str() {
            "ollama" => Ok(Provider::Ollama {
                base_url: config.base_url.clone(),
                model: config.model_or_default(),
            }),
            "openai" | "openai-compatible" => Ok(Provider::OpenAI {
                base_url: config.base_url.clone(),
                api_key: config.api_key_or_env(),
                model: config.model.clone(),
            }),
            other => Err(LLMError::UnknownProvider(other.to_string())),
        }
    }

    /// Base URL the built client will talk to.
    pub fn base_url(&self) -> String {
        match self {
            Provider::Ollama { base_url, .. } => base_url
                .clone()
                .or_else(|| std::env::var("OLLAMA_HOST").ok().map(|h| format!("{}/v1", h.trim_end_matches('/'))))
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            Provider::OpenAI { base_url, .. } => base_url
                .clone()
                .or_else(|| std::env::var("OPENAI_BASE_URL").ok())
                .unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string()),
        }
    }

    /// Creates an LLM client from the provider configuration.
    pub fn build(self, config: &LLMConfig) -> Result<Box<dyn LLM>, LLMError> {
        let base = self.base_url();
        let client = match self {
            Provider::Ollama { model, .. } => OpenAIClient::new(base, "", model),
            Provider::OpenAI { api_key, model, .. } => {
                let key = api_key
                    .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                    .ok_or(LLMError::MissingApiKey)?;
                OpenAIClient::new(base, key, model.unwrap_or_else(|| config.model_or_default()))
            }
        };

        Ok(Box::new(
            client
                .with_sampling(config.temperature, config.top_p)
                .with_timeout(Duration::from_secs(config.timeout_secs)),
        ))
    }
}
