use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
pub struct SearchHit {
    pub title: Option<String>,
    pub url: Option<String>,
    pub created_at_i: Option<i64>,
    #[serde(default)]
    pub points: i64,
    #[serde(rename = "objectID")]
    pub object_id: String,
}

impl SearchHit {
    /// Link for the story: the submitted URL, or the HN discussion page for
    /// text posts.
    pub fn link(&self) -> String {
        match &self.url {
            Some(url) if !url.is_empty() => url.clone(),
            _ => format!("https://news.ycombinator.com/item?id={}", self.object_id),
        }
    }
}
