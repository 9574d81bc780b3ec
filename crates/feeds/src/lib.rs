pub mod catalog;
pub mod rss;
pub mod youtube;

pub use catalog::{curated_feeds, youtube_channels, FeedSpec, YoutubeChannel};
pub use rss::RssFeedAdapter;
pub use youtube::YoutubeFeedAdapter;

use std::time::Duration;

use feed_rs::model::{Entry, Feed};
use time::OffsetDateTime;

use common::{PipelineError, PipelineResult};

const FEED_TIMEOUT: Duration = Duration::from_secs(8);
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

pub(crate) fn feed_client() -> PipelineResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(FEED_TIMEOUT)
        .build()?)
}

pub(crate) async fn fetch_feed(client: &reqwest::Client, url: &str) -> PipelineResult<Feed> {
    let response = client
        .get(url)
        .header(
            reqwest::header::ACCEPT,
            "application/rss+xml, application/atom+xml, text/xml, application/xml",
        )
        .send()
        .await?
        .error_for_status()?;

    let bytes = response.bytes().await?;
    feed_rs::parser::parse(&bytes[..]).map_err(|e| PipelineError::FeedParse(e.to_string()))
}

/// Publication instant of an entry: `published` if present, else `updated`.
pub(crate) fn entry_published_at(entry: &Entry) -> Option<OffsetDateTime> {
    let stamp = entry.published.or(entry.updated)?;
    OffsetDateTime::from_unix_timestamp(stamp.timestamp()).ok()
}

/// Flatten an HTML-bearing summary to plain text, bounded to the item limit.
pub(crate) fn clean_summary(raw: &str) -> String {
    let text = scraper::Html::parse_fragment(raw)
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ");
    common::truncate_chars(text.split_whitespace().collect::<Vec<_>>().join(" ").trim(), 500)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_summary_strips_markup_and_bounds() {
        assert_eq!(
            clean_summary("<p>Hello <b>world</b></p>"),
            "Hello world"
        );
        let long = "x".repeat(900);
        assert_eq!(clean_summary(&long).chars().count(), 500);
    }
}
