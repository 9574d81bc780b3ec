use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use tokio::task::JoinSet;
use tracing::warn;

use common::{Item, SourceAdapter, Tier};

use crate::catalog::{FeedSpec, YoutubeChannel};
use crate::rss::items_from_feed;
use crate::{feed_client, fetch_feed};

/// Collects the Atom feed of each tracked YouTube channel.
pub struct YoutubeFeedAdapter {
    client: reqwest::Client,
    channels: Vec<YoutubeChannel>,
}

impl YoutubeFeedAdapter {
    pub fn new(channels: Vec<YoutubeChannel>) -> common::PipelineResult<Self> {
        Ok(Self {
            client: feed_client()?,
            channels,
        })
    }

    pub fn with_catalog() -> common::PipelineResult<Self> {
        Self::new(crate::catalog::youtube_channels())
    }
}

#[async_trait]
impl SourceAdapter for YoutubeFeedAdapter {
    fn name(&self) -> &'static str {
        "youtube"
    }

    async fn collect(&self, window_hours: i64) -> Vec<Item> {
        let cutoff = OffsetDateTime::now_utc() - Duration::hours(window_hours);
        let mut tasks = JoinSet::new();

        for channel in &self.channels {
            let client = self.client.clone();
            let spec = FeedSpec {
                url: channel.feed_url(),
                title: channel.name.clone(),
                tier: Tier::P1Context,
                lang: channel.lang(),
            };
            tasks.spawn(async move {
                let name = spec.title.clone();
                let result = fetch_feed(&client, &spec.url).await;
                (name, result.map(|feed| items_from_feed(feed, &spec, cutoff)))
            });
        }

        let mut items = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(batch))) => items.extend(batch),
                Ok((name, Err(e))) => warn!("youtube channel '{}' failed: {}", name, e),
                Err(e) => warn!("youtube task failed: {}", e),
            }
        }
        items
    }
}
