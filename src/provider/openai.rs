use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{http_client, CompletionClient};
use crate::errors::{CourseError, CourseResult};

pub const OPENAI_BASE: &str = "https://api.openai.com/v1";
pub const GROQ_BASE: &str = "https://api.groq.com/openai/v1";

/// Chat-completions client for OpenAI and the endpoints that mimic it (Groq).
/// The prompt goes out as a single user message.
pub struct OpenAICompatible {
    base_url: String,
    api_key: String,
    model: String,
    client: Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

impl OpenAICompatible {
    pub fn new(base_url: String, api_key: String, model: String, timeout: Duration) -> CourseResult<Self> {
        Ok(Self { base_url, api_key, model, client: http_client(timeout)? })
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CompletionClient for OpenAICompatible {
    async fn complete(&self, prompt: &str) -> CourseResult<String> {
        let url = self.url();
        let body = ChatRequest {
            model: &self.model,
            messages: vec![Msg { role: "user", content: prompt }],
        };
        debug!(%url, model = %self.model, "POST chat completion");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CourseError::Completion(format!("request to {url} failed: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| CourseError::Completion(format!("reading response body failed: {e}")))?;
        debug!(%status, bytes = text.len(), "chat completion response");

        if !status.is_success() {
            return Err(CourseError::Completion(format!("API error ({status}): {text}")));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| CourseError::Completion(format!("unexpected response envelope: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| CourseError::Completion("response has no message content".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_without_double_slash() {
        let c = OpenAICompatible::new(
            format!("{GROQ_BASE}/"),
            "k".into(),
            "m".into(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(c.url(), "https://api.groq.com/openai/v1/chat/completions");
    }

    #[test]
    fn envelope_without_content_is_detected() {
        let parsed: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant"}}]}"#).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }
}
