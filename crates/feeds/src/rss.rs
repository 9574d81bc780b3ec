use async_trait::async_trait;
use feed_rs::model::Feed;
use time::{Duration, OffsetDateTime};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use common::{host_of, Item, SourceAdapter};

use crate::catalog::FeedSpec;
use crate::{clean_summary, entry_published_at, feed_client, fetch_feed};

/// Collects every configured RSS/Atom feed in parallel.
pub struct RssFeedAdapter {
    client: reqwest::Client,
    feeds: Vec<FeedSpec>,
}

impl RssFeedAdapter {
    pub fn new(feeds: Vec<FeedSpec>) -> common::PipelineResult<Self> {
        Ok(Self {
            client: feed_client()?,
            feeds,
        })
    }

    pub fn with_catalog() -> common::PipelineResult<Self> {
        Self::new(crate::catalog::curated_feeds())
    }

    async fn collect_one(
        client: reqwest::Client,
        spec: FeedSpec,
        cutoff: OffsetDateTime,
    ) -> common::PipelineResult<Vec<Item>> {
        let feed = fetch_feed(&client, &spec.url).await?;
        Ok(items_from_feed(feed, &spec, cutoff))
    }
}

/// Map feed entries onto canonical items, dropping anything outside the
/// window or missing a title, link, or timestamp.
pub(crate) fn items_from_feed(feed: Feed, spec: &FeedSpec, cutoff: OffsetDateTime) -> Vec<Item> {
    let fallback_domain = host_of(&spec.url).unwrap_or_default();

    feed.entries
        .into_iter()
        .filter_map(|entry| {
            let published_at = entry_published_at(&entry)?;
            if published_at < cutoff {
                return None;
            }
            let title = entry.title.as_ref().map(|t| t.content.trim().to_string())?;
            if title.is_empty() {
                return None;
            }
            let link = entry.links.first().map(|l| l.href.clone())?;
            let summary = entry
                .summary
                .as_ref()
                .map(|s| clean_summary(&s.content))
                .unwrap_or_default();

            Some(Item {
                source_domain: host_of(&link).unwrap_or_else(|| fallback_domain.clone()),
                title,
                link,
                published_at,
                summary,
                feed_title: spec.title.clone(),
                tier: spec.tier,
                lang: spec.lang,
            })
        })
        .collect()
}

#[async_trait]
impl SourceAdapter for RssFeedAdapter {
    fn name(&self) -> &'static str {
        "rss"
    }

    async fn collect(&self, window_hours: i64) -> Vec<Item> {
        let cutoff = OffsetDateTime::now_utc() - Duration::hours(window_hours);
        let mut tasks = JoinSet::new();

        for spec in &self.feeds {
            let client = self.client.clone();
            let spec = spec.clone();
            tasks.spawn(async move {
                let title = spec.title.clone();
                (title, Self::collect_one(client, spec, cutoff).await)
            });
        }

        let mut items = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((title, Ok(batch))) => {
                    debug!("{}: {} items", title, batch.len());
                    items.extend(batch);
                }
                Ok((title, Err(e))) => warn!("feed '{}' failed: {}", title, e),
                Err(e) => warn!("feed task failed: {}", e),
            }
        }
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Lang, Tier};

    fn spec() -> FeedSpec {
        FeedSpec {
            url: "https://example.com/feed.xml".into(),
            title: "Example Feed".into(),
            tier: Tier::P0Curated,
            lang: Lang::En,
        }
    }

    #[test]
    fn maps_entries_and_applies_cutoff() {
        let rss_xml = br#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example Feed</title>
    <item>
      <title>GPT-5 ships</title>
      <link>https://news.example.com/gpt5</link>
      <description>Release &lt;b&gt;notes&lt;/b&gt;.</description>
      <pubDate>Mon, 01 Jan 2046 12:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Ancient post</title>
      <link>https://news.example.com/old</link>
      <pubDate>Mon, 01 Jan 2001 12:00:00 GMT</pubDate>
    </item>
    <item>
      <title>No date</title>
      <link>https://news.example.com/undated</link>
    </item>
  </channel>
</rss>"#;

        let feed = feed_rs::parser::parse(&rss_xml[..]).expect("valid rss");
        let cutoff = OffsetDateTime::UNIX_EPOCH + Duration::days(365 * 40);

        let items = items_from_feed(feed, &spec(), cutoff);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "GPT-5 ships");
        assert_eq!(items[0].source_domain, "news.example.com");
        assert_eq!(items[0].summary, "Release notes.");
        assert_eq!(items[0].tier, Tier::P0Curated);
    }

    #[test]
    fn atom_updated_date_is_accepted() {
        let atom_xml = br#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Feed</title>
  <entry>
    <title>Gemini 3 Flash</title>
    <id>urn:uuid:entry-1</id>
    <link href="https://blog.example.com/gemini"/>
    <updated>2046-06-15T10:00:00Z</updated>
  </entry>
</feed>"#;

        let feed = feed_rs::parser::parse(&atom_xml[..]).expect("valid atom");
        let cutoff = OffsetDateTime::UNIX_EPOCH;
        let items = items_from_feed(feed, &spec(), cutoff);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "https://blog.example.com/gemini");
    }
}
