use std::time::Duration as StdDuration;

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Deserialize;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, PrimitiveDateTime};
use tracing::warn;

use common::{host_of, Item, Lang, PipelineResult, SourceAdapter, Tier};

const DOC_API_URL: &str = "https://api.gdeltproject.org/api/v2/doc/doc";
const MAX_RECORDS: usize = 75;
const REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(15);
const QUERY: &str = r#"("artificial intelligence" OR "generative AI" OR "인공지능" OR ChatGPT)"#;

#[derive(Debug, Deserialize)]
struct DocResponse {
    #[serde(default)]
    articles: Vec<DocArticle>,
}

#[derive(Debug, Deserialize)]
struct DocArticle {
    url: Option<String>,
    title: Option<String>,
    #[serde(rename = "seendate")]
    seen_date: Option<String>,
    language: Option<String>,
    domain: Option<String>,
}

/// Worldwide news mentions via the GDELT DOC 2.0 API.
pub struct GdeltAdapter {
    client: reqwest::Client,
}

impl GdeltAdapter {
    pub fn new() -> PipelineResult<Self> {
        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()?,
        })
    }

    async fn fetch(&self, start: OffsetDateTime, end: OffsetDateTime) -> PipelineResult<DocResponse> {
        let encoded = utf8_percent_encode(QUERY, NON_ALPHANUMERIC).to_string();
        let url = format!(
            "{DOC_API_URL}?query={encoded}&mode=artlist&format=json&maxrecords={MAX_RECORDS}&sort=datedesc&startdatetime={}&enddatetime={}",
            compact_timestamp(start),
            compact_timestamp(end),
        );

        let response = self.client.get(&url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }

    fn item_from_article(article: DocArticle, cutoff: OffsetDateTime) -> Option<Item> {
        let published_at = parse_compact_timestamp(article.seen_date.as_deref()?)?;
        if published_at < cutoff {
            return None;
        }
        let url = article.url?;
        let title = article.title.unwrap_or_default().trim().to_string();
        if title.is_empty() {
            return None;
        }
        let source_domain = article
            .domain
            .map(|d| d.to_lowercase())
            .or_else(|| host_of(&url))
            .unwrap_or_default();

        Some(Item {
            title,
            link: url,
            published_at,
            summary: String::new(),
            source_domain,
            feed_title: "GDELT".to_string(),
            tier: Tier::P2Raw,
            lang: lang_from_label(article.language.as_deref()),
        })
    }
}

#[async_trait]
impl SourceAdapter for GdeltAdapter {
    fn name(&self) -> &'static str {
        "gdelt"
    }

    async fn collect(&self, window_hours: i64) -> Vec<Item> {
        let end = OffsetDateTime::now_utc();
        let start = end - Duration::hours(window_hours);

        match self.fetch(start, end).await {
            Ok(response) => response
                .articles
                .into_iter()
                .filter_map(|a| Self::item_from_article(a, start))
                .collect(),
            Err(e) => {
                warn!("GDELT fetch failed: {}", e);
                Vec::new()
            }
        }
    }
}

/// `YYYYMMDDhhmmss`, the format the DOC API uses for both request bounds and
/// the `seendate` field.
fn compact_timestamp(at: OffsetDateTime) -> String {
    let fmt = format_description!("[year][month][day][hour][minute][second]");
    at.format(&fmt).unwrap_or_default()
}

fn parse_compact_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let fmt = format_description!("[year][month][day][hour][minute][second]");
    // Some artlist rows carry a trailing "Z".
    let raw = raw.trim_end_matches('Z');
    PrimitiveDateTime::parse(raw, &fmt)
        .ok()
        .map(|dt| dt.assume_utc())
}

fn lang_from_label(label: Option<&str>) -> Lang {
    match label {
        Some("Korean") => Lang::Ko,
        _ => Lang::En,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_timestamp_round_trips() {
        let at = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let compact = compact_timestamp(at);
        assert_eq!(compact.len(), 14);
        assert_eq!(parse_compact_timestamp(&compact), Some(at));
    }

    #[test]
    fn parses_seendate_with_zulu_suffix() {
        let parsed = parse_compact_timestamp("20260101093000Z").unwrap();
        assert_eq!(parsed.hour(), 9);
        assert_eq!(parsed.minute(), 30);
    }

    #[test]
    fn language_label_mapping() {
        assert_eq!(lang_from_label(Some("Korean")), Lang::Ko);
        assert_eq!(lang_from_label(Some("English")), Lang::En);
        assert_eq!(lang_from_label(None), Lang::En);
    }

    #[test]
    fn article_outside_window_is_dropped() {
        let cutoff = parse_compact_timestamp("20260101000000").unwrap();
        let stale = DocArticle {
            url: Some("https://example.com/a".into()),
            title: Some("old AI story".into()),
            seen_date: Some("20251230120000".into()),
            language: Some("English".into()),
            domain: Some("Example.com".into()),
        };
        assert!(GdeltAdapter::item_from_article(stale, cutoff).is_none());
    }
}
