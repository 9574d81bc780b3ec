use std::time::Duration;

use common::PipelineResult;

use crate::models::SearchResponse;

const ALGOLIA_BASE_URL: &str = "https://hn.algolia.com/api/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct HackerNewsAPI {
    client: reqwest::Client,
    base_url: String,
}

impl HackerNewsAPI {
    pub fn new() -> PipelineResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: ALGOLIA_BASE_URL.to_string(),
        })
    }

    /// Time-bounded story search, newest first.
    pub async fn search_since(
        &self,
        query: &str,
        since_epoch: i64,
        hits_per_page: usize,
    ) -> PipelineResult<SearchResponse> {
        let url = format!("{}/search_by_date", self.base_url);
        let filters = format!("created_at_i>{since_epoch}");
        let page_size = hits_per_page.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("query", query),
                ("tags", "story"),
                ("numericFilters", filters.as_str()),
                ("hitsPerPage", page_size.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }
}
