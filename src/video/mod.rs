use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::errors::CourseResult;
use crate::provider::http_client;
use crate::wire::Video;

pub const YOUTUBE_SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";

/// Ordered candidate videos for a query. Lookups are best-effort: any
/// failure is logged and reported as no results.
#[async_trait]
pub trait VideoSearch: Send + Sync {
    async fn search(&self, query: &str, limit: u32) -> Vec<Video>;
}

/// The video attached to a chapter is always the first candidate.
pub fn select_first(videos: &[Video]) -> Option<&Video> {
    videos.first()
}

pub fn chapter_query(course_name: &str, chapter_name: &str) -> String {
    format!("{} {}", course_name.trim(), chapter_name.trim())
}

pub struct YouTube {
    api_key: Option<String>,
    client: Client,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    id: ItemId,
    #[serde(default)]
    snippet: Option<Snippet>,
}

#[derive(Deserialize)]
struct ItemId {
    #[serde(rename = "videoId", default)]
    video_id: Option<String>,
}

#[derive(Deserialize)]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(rename = "channelTitle", default)]
    channel_title: String,
    #[serde(default)]
    thumbnails: Option<Thumbnails>,
}

#[derive(Deserialize)]
struct Thumbnails {
    #[serde(default)]
    default: Option<Thumbnail>,
}

#[derive(Deserialize)]
struct Thumbnail {
    url: String,
}

impl YouTube {
    /// A missing key is allowed; searches then return nothing.
    pub fn new(api_key: Option<String>, timeout: Duration) -> CourseResult<Self> {
        Ok(Self { api_key, client: http_client(timeout)? })
    }

    pub fn from_env(timeout: Duration) -> CourseResult<Self> {
        let key = std::env::var("YOUTUBE_API_KEY").ok().filter(|k| !k.trim().is_empty());
        Self::new(key, timeout)
    }

    async fn fetch(&self, key: &str, query: &str, limit: u32) -> Result<Vec<Video>, String> {
        let max_results = limit.to_string();
        let resp = self
            .client
            .get(YOUTUBE_SEARCH_URL)
            .query(&[
                ("part", "snippet"),
                ("q", query),
                ("maxResults", max_results.as_str()),
                ("key", key),
                ("type", "video"),
            ])
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| e.to_string())?;
        if !status.is_success() {
            return Err(format!("status {status}: {text}"));
        }
        let parsed: SearchResponse = serde_json::from_str(&text).map_err(|e| e.to_string())?;
        Ok(videos_from(parsed))
    }
}

fn videos_from(resp: SearchResponse) -> Vec<Video> {
    resp.items
        .into_iter()
        .filter_map(|item| {
            let id = item.id.video_id?;
            let snippet = item.snippet;
            Some(Video {
                id,
                title: snippet.as_ref().map(|s| s.title.clone()).unwrap_or_default(),
                channel: snippet.as_ref().map(|s| s.channel_title.clone()).unwrap_or_default(),
                thumbnail: snippet
                    .and_then(|s| s.thumbnails)
                    .and_then(|t| t.default)
                    .map(|t| t.url)
                    .unwrap_or_default(),
            })
        })
        .collect()
}

#[async_trait]
impl VideoSearch for YouTube {
    async fn search(&self, query: &str, limit: u32) -> Vec<Video> {
        let Some(key) = self.api_key.as_deref() else {
            warn!("YOUTUBE_API_KEY is not set; skipping video search");
            return Vec::new();
        };
        debug!(query, limit, "searching videos");
        match self.fetch(key, query, limit).await {
            Ok(videos) => videos,
            Err(e) => {
                warn!(query, "video search failed: {e}");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(id: &str) -> Video {
        Video { id: id.into(), title: format!("t-{id}"), channel: "c".into(), thumbnail: String::new() }
    }

    #[test]
    fn first_result_is_deterministic() {
        let videos = vec![video("a1"), video("b2"), video("c3")];
        for _ in 0..5 {
            assert_eq!(select_first(&videos).map(|v| v.id.as_str()), Some("a1"));
        }
        assert!(select_first(&[]).is_none());
    }

    #[test]
    fn parses_search_items_and_skips_non_videos() {
        let raw = r#"{
            "items": [
                {"id": {"kind": "youtube#video", "videoId": "abc"},
                 "snippet": {"title": "Intro", "channelTitle": "Chan",
                             "thumbnails": {"default": {"url": "http://img"}}}},
                {"id": {"kind": "youtube#channel", "channelId": "zzz"}}
            ]
        }"#;
        let parsed: SearchResponse = serde_json::from_str(raw).unwrap();
        let videos = videos_from(parsed);
        assert_eq!(
            videos,
            vec![Video {
                id: "abc".into(),
                title: "Intro".into(),
                channel: "Chan".into(),
                thumbnail: "http://img".into(),
            }]
        );
    }

    #[test]
    fn query_joins_course_and_chapter() {
        assert_eq!(chapter_query(" Rust ", "Ownership "), "Rust Ownership");
    }

    #[tokio::test]
    async fn missing_key_returns_empty() {
        let yt = YouTube::new(None, Duration::from_secs(1)).unwrap();
        assert!(yt.search("rust", 1).await.is_empty());
    }
}
