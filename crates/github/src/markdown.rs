use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime};
use tracing::warn;

use common::{contains_hangul, host_of, Item, Lang, SourceAdapter, Tier};

use crate::client::GithubClient;

/// Default curated link-list location: a repo that commits one markdown brief
/// per day, named by date.
const DEFAULT_REPO: &str = "ai-news-briefs/daily";
const DEFAULT_PATH: &str = "briefs";

/// Link aggregator domains dropped from curated briefs.
const SKIPPED_DOMAINS: [&str; 6] = [
    "twitter.com",
    "x.com",
    "facebook.com",
    "instagram.com",
    "reddit.com",
    "threads.net",
];

/// Newest date-named files downloaded per run.
const MAX_FILES: usize = 3;

#[derive(Debug, Deserialize)]
struct ContentEntry {
    name: String,
    download_url: Option<String>,
    #[serde(rename = "type")]
    entry_type: String,
}

/// Curated daily markdown briefs: date-named files of `[title](url)` lines.
pub struct MarkdownListingAdapter {
    client: GithubClient,
    repo: String,
    path: String,
}

impl MarkdownListingAdapter {
    pub fn new(client: GithubClient) -> Self {
        Self {
            client,
            repo: DEFAULT_REPO.to_string(),
            path: DEFAULT_PATH.to_string(),
        }
    }

    pub fn with_location(mut self, repo: &str, path: &str) -> Self {
        self.repo = repo.to_string();
        self.path = path.to_string();
        self
    }

    async fn list_recent_files(
        &self,
        cutoff_date: Date,
    ) -> common::PipelineResult<Vec<(Date, String)>> {
        let path = format!("/repos/{}/contents/{}", self.repo, self.path);
        let entries: Option<Vec<ContentEntry>> = self.client.get_json(&path, &[]).await?;

        let mut dated: Vec<(Date, String)> = entries
            .unwrap_or_default()
            .into_iter()
            .filter(|e| e.entry_type == "file")
            .filter_map(|e| {
                let date = filename_date(&e.name)?;
                if date < cutoff_date {
                    return None;
                }
                Some((date, e.download_url?))
            })
            .collect();

        dated.sort_by(|a, b| b.0.cmp(&a.0));
        dated.truncate(MAX_FILES);
        Ok(dated)
    }
}

#[async_trait]
impl SourceAdapter for MarkdownListingAdapter {
    fn name(&self) -> &'static str {
        "github_markdown"
    }

    async fn collect(&self, window_hours: i64) -> Vec<Item> {
        let cutoff = OffsetDateTime::now_utc() - Duration::hours(window_hours);
        let files = match self.list_recent_files(cutoff.date()).await {
            Ok(files) => files,
            Err(e) => {
                warn!("markdown listing for '{}' failed: {}", self.repo, e);
                return Vec::new();
            }
        };

        let mut items = Vec::new();
        for (date, download_url) in files {
            match self.client.get_text(&download_url).await {
                Ok(body) => items.extend(items_from_markdown(&body, date)),
                Err(e) => warn!("markdown download failed: {}", e),
            }
        }
        items
    }
}

/// Date embedded in a brief filename, e.g. `2026-08-01.md`.
fn filename_date(name: &str) -> Option<Date> {
    let re = Regex::new(r"(\d{4}-\d{2}-\d{2})").ok()?;
    let captured = re.captures(name)?.get(1)?.as_str();
    let fmt = format_description!("[year]-[month]-[day]");
    Date::parse(captured, &fmt).ok()
}

/// Extract `[title](url)` pairs, skipping link-aggregator domains.
fn items_from_markdown(body: &str, date: Date) -> Vec<Item> {
    let link_re = match Regex::new(r"\[([^\]]+)\]\((https?://[^\s)]+)\)") {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };
    let published_at = date.midnight().assume_utc();

    link_re
        .captures_iter(body)
        .filter_map(|caps| {
            let title = caps.get(1)?.as_str().trim().to_string();
            let url = caps.get(2)?.as_str().to_string();
            let domain = host_of(&url)?;
            if SKIPPED_DOMAINS.contains(&domain.as_str()) {
                return None;
            }
            let lang = if contains_hangul(&title) { Lang::Ko } else { Lang::En };
            Some(Item {
                title,
                link: url,
                published_at,
                summary: String::new(),
                source_domain: domain,
                feed_title: "Curated Briefs".to_string(),
                tier: Tier::P0Curated,
                lang,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_date_extraction() {
        let date = filename_date("brief-2026-08-01.md").unwrap();
        assert_eq!(date.to_string(), "2026-08-01");
        assert!(filename_date("README.md").is_none());
    }

    #[test]
    fn markdown_links_become_curated_items() {
        let body = "\
# Daily brief\n\
- [GPT-5 출시 발표](https://openai.com/gpt-5)\n\
- [Thread on X](https://x.com/someone/status/1)\n\
- [Llama 4 benchmarks](https://ai.meta.com/blog/llama4?utm_source=brief)\n";

        let date = filename_date("2026-08-01.md").unwrap();
        let items = items_from_markdown(body, date);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "GPT-5 출시 발표");
        assert_eq!(items[0].lang, Lang::Ko);
        assert_eq!(items[0].tier, Tier::P0Curated);
        assert_eq!(items[1].lang, Lang::En);
        assert!(items.iter().all(|i| i.source_domain != "x.com"));
    }
}
