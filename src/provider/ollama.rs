use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{http_client, CompletionClient};
use crate::errors::{CourseError, CourseResult};

pub const OLLAMA_BASE: &str = "http://localhost:11434";

pub struct Ollama {
    url: String,
    model: String,
    client: Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: MsgOut,
}

#[derive(Deserialize)]
struct MsgOut {
    content: String,
}

impl Ollama {
    pub fn new(url: String, model: String, timeout: Duration) -> CourseResult<Self> {
        Ok(Self { url, model, client: http_client(timeout)? })
    }
}

#[async_trait]
impl CompletionClient for Ollama {
    async fn complete(&self, prompt: &str) -> CourseResult<String> {
        let url = format!("{}/api/chat", self.url.trim_end_matches('/'));
        let body = ChatRequest {
            model: &self.model,
            messages: vec![Msg { role: "user", content: prompt }],
            stream: false,
            options: OllamaOptions { temperature: 0.2 },
        };
        debug!(%url, model = %self.model, "POST ollama chat");

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CourseError::Completion(format!("ollama request failed: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| CourseError::Completion(format!("ollama read body failed: {e}")))?;
        if !status.is_success() {
            return Err(CourseError::Completion(format!("ollama error ({status}): {text}")));
        }

        // Some proxies hand back the bare message text instead of the envelope.
        Ok(match serde_json::from_str::<ChatResponse>(&text) {
            Ok(c) => c.message.content,
            Err(_) => text,
        })
    }
}
