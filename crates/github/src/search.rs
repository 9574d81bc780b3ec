use async_trait::async_trait;
use serde::Deserialize;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Duration, OffsetDateTime};
use tracing::warn;

use common::{truncate_chars, Item, Lang, SourceAdapter, Tier};

use crate::client::GithubClient;

const PER_PAGE: &str = "30";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<RepoHit>,
}

#[derive(Debug, Deserialize)]
struct RepoHit {
    full_name: String,
    html_url: String,
    description: Option<String>,
    created_at: String,
}

/// Freshly created AI repositories via the repo search API.
pub struct GithubSearchAdapter {
    client: GithubClient,
}

impl GithubSearchAdapter {
    pub fn new(client: GithubClient) -> Self {
        Self { client }
    }

    fn item_from_hit(hit: RepoHit, cutoff: OffsetDateTime) -> Option<Item> {
        let created = OffsetDateTime::parse(&hit.created_at, &Rfc3339).ok()?;
        if created < cutoff {
            return None;
        }
        Some(Item {
            title: hit.full_name.clone(),
            link: hit.html_url,
            published_at: created,
            summary: hit
                .description
                .map(|d| truncate_chars(d.trim(), 500))
                .unwrap_or_default(),
            source_domain: "github.com".to_string(),
            feed_title: "GitHub Search".to_string(),
            tier: Tier::Community,
            lang: Lang::En,
        })
    }
}

#[async_trait]
impl SourceAdapter for GithubSearchAdapter {
    fn name(&self) -> &'static str {
        "github_search"
    }

    async fn collect(&self, window_hours: i64) -> Vec<Item> {
        let cutoff = OffsetDateTime::now_utc() - Duration::hours(window_hours);
        let date_fmt = format_description!("[year]-[month]-[day]");
        let Ok(since) = cutoff.format(&date_fmt) else {
            return Vec::new();
        };

        let query = format!("topic:llm OR topic:generative-ai created:>{since}");
        let result: common::PipelineResult<Option<SearchResponse>> = self
            .client
            .get_json(
                "/search/repositories",
                &[
                    ("q", query.as_str()),
                    ("sort", "stars"),
                    ("order", "desc"),
                    ("per_page", PER_PAGE),
                ],
            )
            .await;

        match result {
            Ok(Some(response)) => response
                .items
                .into_iter()
                .filter_map(|hit| Self::item_from_hit(hit, cutoff))
                .collect(),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("GitHub repo search failed: {}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_repo_maps_to_community_item() {
        let cutoff = OffsetDateTime::from_unix_timestamp(0).unwrap();
        let item = GithubSearchAdapter::item_from_hit(
            RepoHit {
                full_name: "acme/agent-kit".into(),
                html_url: "https://github.com/acme/agent-kit".into(),
                description: Some("Agent toolkit".into()),
                created_at: "2026-01-05T10:00:00Z".into(),
            },
            cutoff,
        )
        .unwrap();
        assert_eq!(item.tier, Tier::Community);
        assert_eq!(item.source_domain, "github.com");
        assert_eq!(item.summary, "Agent toolkit");
    }

    #[test]
    fn malformed_timestamp_is_dropped() {
        let cutoff = OffsetDateTime::from_unix_timestamp(0).unwrap();
        assert!(GithubSearchAdapter::item_from_hit(
            RepoHit {
                full_name: "acme/x".into(),
                html_url: "https://github.com/acme/x".into(),
                description: None,
                created_at: "yesterday".into(),
            },
            cutoff,
        )
        .is_none());
    }
}
