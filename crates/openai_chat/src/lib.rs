use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

const OPENAI_API_URL: &str = "https://api.openai.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// The seam the pipeline calls for every model interaction; tests substitute
/// a scripted fake.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn chat(&self, system: &str, user: &str, temperature: f32) -> Result<String>;
}

/// Chat-completions client for OpenAI-compatible endpoints.
pub struct ChatClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl ChatClient {
    pub fn new(api_key: &str, model: &str) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()?,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: OPENAI_API_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[async_trait]
impl ChatApi for ChatClient {
    async fn chat(&self, system: &str, user: &str, temperature: f32) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user.to_string(),
                },
            ],
            temperature,
        };

        debug!(model = %self.model, temperature, "chat request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("chat API error ({status}): {error_text}"));
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("empty chat response"))
    }
}

/// Stand-in used when no API key is configured. Every call fails, which the
/// callers treat as any other model outage.
pub struct DisabledChat;

#[async_trait]
impl ChatApi for DisabledChat {
    async fn chat(&self, _system: &str, _user: &str, _temperature: f32) -> Result<String> {
        Err(anyhow!("OPENAI_API_KEY is not configured"))
    }
}
