pub mod api;
pub mod models;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use tracing::warn;

use api::HackerNewsAPI;
use common::{host_of, Item, Lang, SourceAdapter, Tier};
use models::SearchHit;

const QUERIES: [&str; 2] = ["AI", "LLM"];
const HITS_PER_QUERY: usize = 50;

/// Hacker News stories via the Algolia search API.
pub struct HackerNewsAdapter {
    api: HackerNewsAPI,
}

impl HackerNewsAdapter {
    pub fn new() -> common::PipelineResult<Self> {
        Ok(Self {
            api: HackerNewsAPI::new()?,
        })
    }

    fn item_from_hit(hit: SearchHit, cutoff: OffsetDateTime) -> Option<Item> {
        let created = OffsetDateTime::from_unix_timestamp(hit.created_at_i?).ok()?;
        if created < cutoff {
            return None;
        }
        let title = hit.title.as_deref().unwrap_or("").trim().to_string();
        if title.is_empty() {
            return None;
        }
        let link = hit.link();
        Some(Item {
            source_domain: host_of(&link).unwrap_or_else(|| "news.ycombinator.com".to_string()),
            title,
            link,
            published_at: created,
            summary: String::new(),
            feed_title: "Hacker News".to_string(),
            tier: Tier::Community,
            lang: Lang::En,
        })
    }
}

#[async_trait]
impl SourceAdapter for HackerNewsAdapter {
    fn name(&self) -> &'static str {
        "hacker_news"
    }

    async fn collect(&self, window_hours: i64) -> Vec<Item> {
        let cutoff = OffsetDateTime::now_utc() - Duration::hours(window_hours);
        let since_epoch = cutoff.unix_timestamp();

        let mut items = Vec::new();
        for query in QUERIES {
            match self.api.search_since(query, since_epoch, HITS_PER_QUERY).await {
                Ok(response) => {
                    items.extend(
                        response
                            .hits
                            .into_iter()
                            .filter_map(|hit| Self::item_from_hit(hit, cutoff)),
                    );
                }
                Err(e) => warn!("HN query '{}' failed: {}", query, e),
            }
        }
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(title: &str, url: Option<&str>, created: i64) -> SearchHit {
        SearchHit {
            title: Some(title.to_string()),
            url: url.map(str::to_string),
            created_at_i: Some(created),
            points: 42,
            object_id: "1001".to_string(),
        }
    }

    #[test]
    fn maps_hit_to_item() {
        let cutoff = OffsetDateTime::from_unix_timestamp(1_000).unwrap();
        let item = HackerNewsAdapter::item_from_hit(
            hit("Llama 4 released", Some("https://ai.meta.com/llama4"), 2_000),
            cutoff,
        )
        .unwrap();
        assert_eq!(item.source_domain, "ai.meta.com");
        assert_eq!(item.tier, Tier::Community);
    }

    #[test]
    fn text_post_falls_back_to_discussion_link() {
        let cutoff = OffsetDateTime::from_unix_timestamp(1_000).unwrap();
        let item = HackerNewsAdapter::item_from_hit(hit("Ask HN: best LLM?", None, 2_000), cutoff)
            .unwrap();
        assert_eq!(item.link, "https://news.ycombinator.com/item?id=1001");
        assert_eq!(item.source_domain, "news.ycombinator.com");
    }

    #[test]
    fn old_hit_is_dropped() {
        let cutoff = OffsetDateTime::from_unix_timestamp(5_000).unwrap();
        assert!(HackerNewsAdapter::item_from_hit(hit("old", None, 2_000), cutoff).is_none());
    }
}
