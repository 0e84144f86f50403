mod error;
pub mod ollama;
mod openai;
mod provider;

pub use error::LLMError;
pub use openai::OpenAIClient;
pub use provider::Provider;

use async_trait::async_trait;

/// Trait for Large Language Model providers.
///
/// Report synthesis only needs one capability: turn a prompt plus a system
/// message into text. Retrying and re-prompting is the caller's business.
#[async_trait]
pub trait LLM: Send + Sync {
    /// Generate a completion for `prompt` under the given system message.
    async fn generate(&self, prompt: &str, system: &str) -> Result<String, LLMError>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}

/// Blanket implementation for boxed trait objects.
#[async_trait]
impl LLM for Box<dyn LLM> {
    async fn generate(&self, prompt: &str, system: &str) -> Result<String, LLMError> {
        (**self).generate(prompt, system).await
    }

    fn model(&self) -> &str {
        (**self).model()
    }
}
