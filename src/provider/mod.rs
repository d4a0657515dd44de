use async_trait::async_trait;
use std::time::Duration;

use crate::cli::ProviderKind;
use crate::config::Config;
use crate::errors::{CourseError, CourseResult};

pub mod anthropic;
pub mod ollama;
pub mod openai;

/// One prompt in, the model's raw text out. Any transport, auth or status
/// failure is an error; what the text contains is not this layer's concern.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> CourseResult<String>;
}

pub type DynClient = Box<dyn CompletionClient>;

pub(crate) fn api_key(var: &'static str) -> CourseResult<String> {
    std::env::var(var)
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or(CourseError::MissingCredential(var))
}

pub(crate) fn http_client(timeout: Duration) -> CourseResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| CourseError::Completion(format!("building http client: {e}")))
}

pub fn make_client(cfg: &Config) -> CourseResult<DynClient> {
    let model = cfg.model_name().to_string();
    let timeout = Duration::from_secs(cfg.timeout_secs);
    let base = cfg.api_base.clone();

    match cfg.provider {
        ProviderKind::OpenAI => Ok(Box::new(openai::OpenAICompatible::new(
            base.unwrap_or_else(|| openai::OPENAI_BASE.to_string()),
            api_key("OPENAI_API_KEY")?,
            model,
            timeout,
        )?)),
        ProviderKind::Groq => Ok(Box::new(openai::OpenAICompatible::new(
            base.unwrap_or_else(|| openai::GROQ_BASE.to_string()),
            api_key("GROQ_API_KEY")?,
            model,
            timeout,
        )?)),
        ProviderKind::Anthropic => Ok(Box::new(anthropic::Anthropic::new(
            base.unwrap_or_else(|| anthropic::ANTHROPIC_BASE.to_string()),
            api_key("ANTHROPIC_API_KEY")?,
            model,
            timeout,
        )?)),
        ProviderKind::Ollama => Ok(Box::new(ollama::Ollama::new(
            base.unwrap_or_else(|| ollama::OLLAMA_BASE.to_string()),
            model,
            timeout,
        )?)),
    }
}
