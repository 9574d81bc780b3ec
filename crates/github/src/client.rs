use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;
use tracing::debug;

use common::{PipelineError, PipelineResult};

const API_BASE_URL: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimal authenticated GitHub REST v3 client shared by the adapters.
#[derive(Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    token: String,
    base_url: String,
}

impl GithubClient {
    pub fn new(token: &str) -> PipelineResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent("trend-snapshot-pipeline")
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            token: token.to_string(),
            base_url: API_BASE_URL.to_string(),
        })
    }

    fn headers(&self) -> PipelineResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.token))
                .map_err(|e| PipelineError::Api(format!("invalid token header: {e}")))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static(API_VERSION),
        );
        Ok(headers)
    }

    /// GET an API path. A 404 is an empty result, not an error.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> PipelineResult<Option<T>> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "GitHub API request");

        let response = self
            .http
            .get(&url)
            .headers(self.headers()?)
            .query(query)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status()?;
        Ok(Some(response.json().await?))
    }

    /// GET an absolute URL (raw file downloads) as text.
    pub async fn get_text(&self, url: &str) -> PipelineResult<String> {
        let response = self
            .http
            .get(url)
            .headers(self.headers()?)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }
}
