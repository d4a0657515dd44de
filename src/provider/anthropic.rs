use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{http_client, CompletionClient};
use crate::errors::{CourseError, CourseResult};

pub const ANTHROPIC_BASE: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

pub struct Anthropic {
    base_url: String,
    api_key: String,
    model: String,
    client: Client,
}

#[derive(Serialize)]
struct MsgRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Msg<'a>>,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MsgResponse {
    content: Vec<Block>,
}

#[derive(Deserialize)]
struct Block {
    #[serde(default)]
    text: String,
    #[serde(default)]
    r#type: String,
}

impl Anthropic {
    pub fn new(base_url: String, api_key: String, model: String, timeout: Duration) -> CourseResult<Self> {
        Ok(Self { base_url, api_key, model, client: http_client(timeout)? })
    }
}

/// Concatenates the text blocks of a messages response.
fn joined_text(resp: MsgResponse) -> Option<String> {
    let text: String = resp
        .content
        .into_iter()
        .filter(|b| b.r#type == "text" || !b.text.is_empty())
        .map(|b| b.text)
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[async_trait]
impl CompletionClient for Anthropic {
    async fn complete(&self, prompt: &str) -> CourseResult<String> {
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let body = MsgRequest {
            model: &self.model,
            max_tokens: 4096,
            messages: vec![Msg { role: "user", content: prompt }],
        };
        debug!(%url, model = %self.model, "POST messages");

        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| CourseError::Completion(format!("anthropic request failed: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| CourseError::Completion(format!("anthropic read body failed: {e}")))?;
        if !status.is_success() {
            return Err(CourseError::Completion(format!("anthropic API error ({status}): {text}")));
        }

        let parsed: MsgResponse = serde_json::from_str(&text)
            .map_err(|e| CourseError::Completion(format!("anthropic response parse error: {e}")))?;
        joined_text(parsed).ok_or_else(|| CourseError::Completion("anthropic: empty content".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_text_blocks_in_order() {
        let resp: MsgResponse = serde_json::from_str(
            r#"{"content":[{"type":"text","text":"Hello "},{"type":"tool_use"},{"type":"text","text":"world"}]}"#,
        )
        .unwrap();
        assert_eq!(joined_text(resp).as_deref(), Some("Hello world"));
    }

    #[test]
    fn empty_content_is_none() {
        let resp: MsgResponse = serde_json::from_str(r#"{"content":[]}"#).unwrap();
        assert!(joined_text(resp).is_none());
    }
}
