pub mod og;

pub use og::{extract_og_image, ImageProbe, OgImageFetcher};

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::debug;

use common::SourceKind;

const TAVILY_API_URL: &str = "https://api.tavily.com/search";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_RESULTS: usize = 8;

/// One external search result, normalized across result groups.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: Option<String>,
    pub image_url: Option<String>,
    pub published_at: Option<OffsetDateTime>,
}

/// External search seam; the pipeline calls one query per source kind.
#[async_trait]
pub trait SearchApi: Send + Sync {
    async fn search(&self, query: &str, kind: SourceKind) -> Result<Vec<SearchHit>>;
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
    #[serde(default)]
    images: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    title: Option<String>,
    url: String,
    content: Option<String>,
    published_date: Option<String>,
}

/// Tavily-compatible search client.
pub struct TavilyClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl TavilyClient {
    pub fn new(api_key: &str) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()?,
            api_key: api_key.to_string(),
            base_url: TAVILY_API_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }
}

#[async_trait]
impl SearchApi for TavilyClient {
    async fn search(&self, query: &str, kind: SourceKind) -> Result<Vec<SearchHit>> {
        // News gets a tight window; everything else a monthly one.
        let (topic, time_range) = match kind {
            SourceKind::News => ("news", "week"),
            _ => ("general", "month"),
        };
        let effective_query = match kind {
            SourceKind::Video => format!("{query} site:youtube.com"),
            _ => query.to_string(),
        };

        let body = serde_json::json!({
            "query": effective_query,
            "topic": topic,
            "time_range": time_range,
            "max_results": MAX_RESULTS,
            "include_images": kind == SourceKind::Image,
        });

        debug!(query = %effective_query, kind = kind.as_str(), "search request");

        let response = self
            .http
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("search API error ({status}): {text}"));
        }

        let parsed: TavilyResponse = response.json().await?;

        if kind == SourceKind::Image {
            return Ok(parsed
                .images
                .into_iter()
                .map(|url| SearchHit {
                    title: query.to_string(),
                    url: url.clone(),
                    snippet: None,
                    image_url: Some(url),
                    published_at: None,
                })
                .collect());
        }

        Ok(parsed
            .results
            .into_iter()
            .filter_map(|r| {
                let title = r.title.unwrap_or_default().trim().to_string();
                if title.is_empty() {
                    return None;
                }
                Some(SearchHit {
                    title,
                    url: r.url,
                    snippet: r.content,
                    image_url: None,
                    published_at: r
                        .published_date
                        .and_then(|d| OffsetDateTime::parse(&d, &Rfc3339).ok()),
                })
            })
            .collect())
    }
}

/// Stand-in used when no search key is configured; every group comes back
/// empty and keywords are persisted with degraded fields.
pub struct DisabledSearch;

#[async_trait]
impl SearchApi for DisabledSearch {
    async fn search(&self, _query: &str, _kind: SourceKind) -> Result<Vec<SearchHit>> {
        Ok(Vec::new())
    }
}
