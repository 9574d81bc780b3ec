use std::time::Duration as StdDuration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime};
use tokio::task::JoinSet;
use tracing::warn;
use url::Url;

use common::{host_of, Item, Lang, PipelineError, PipelineResult, SourceAdapter, Tier};

const REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(10);
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// CSS selectors for one changelog page layout.
#[derive(Debug, Clone)]
pub struct SelectorStrategy {
    pub entry: String,
    pub title: String,
    pub date: String,
}

/// One scraped vendor changelog.
#[derive(Debug, Clone)]
pub struct ChangelogSource {
    pub name: String,
    pub url: String,
    pub lang: Lang,
    pub strategy: SelectorStrategy,
}

impl ChangelogSource {
    fn new(name: &str, url: &str, lang: Lang, entry: &str, title: &str, date: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            lang,
            strategy: SelectorStrategy {
                entry: entry.to_string(),
                title: title.to_string(),
                date: date.to_string(),
            },
        }
    }
}

pub fn default_sources() -> Vec<ChangelogSource> {
    vec![
        ChangelogSource::new(
            "OpenAI Release Notes",
            "https://help.openai.com/en/articles/6825453-chatgpt-release-notes",
            Lang::En,
            "article section",
            "h2",
            "h2",
        ),
        ChangelogSource::new(
            "Cursor Changelog",
            "https://cursor.com/changelog",
            Lang::En,
            "article",
            "h2",
            "time",
        ),
        ChangelogSource::new(
            "GitHub Copilot Changelog",
            "https://github.blog/changelog/label/copilot/",
            Lang::En,
            "article",
            "h3 a",
            "time",
        ),
    ]
}

/// Vendor changelog pages scraped with per-source selector strategies.
pub struct ChangelogAdapter {
    client: reqwest::Client,
    sources: Vec<ChangelogSource>,
}

impl ChangelogAdapter {
    pub fn new(sources: Vec<ChangelogSource>) -> common::PipelineResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client, sources })
    }

    pub fn with_catalog() -> common::PipelineResult<Self> {
        Self::new(default_sources())
    }
}

#[async_trait]
impl SourceAdapter for ChangelogAdapter {
    fn name(&self) -> &'static str {
        "changelog"
    }

    async fn collect(&self, window_hours: i64) -> Vec<Item> {
        let cutoff = OffsetDateTime::now_utc() - Duration::hours(window_hours);
        let mut tasks = JoinSet::new();

        for source in &self.sources {
            let client = self.client.clone();
            let source = source.clone();
            tasks.spawn(async move {
                let name = source.name.clone();
                let result = async {
                    let html = client
                        .get(&source.url)
                        .send()
                        .await?
                        .error_for_status()?
                        .text()
                        .await?;
                    parse_entries(&html, &source, cutoff)
                }
                .await;
                (name, result)
            });
        }

        let mut items = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(batch))) => items.extend(batch),
                Ok((name, Err(e))) => warn!("changelog '{}' failed: {}", name, e),
                Err(e) => warn!("changelog task failed: {}", e),
            }
        }
        items
    }
}

fn compile(selector: &str) -> PipelineResult<Selector> {
    Selector::parse(selector).map_err(|e| PipelineError::HtmlParse(format!("{selector}: {e}")))
}

/// Extract date-bearing entries newer than the cutoff.
pub fn parse_entries(
    html: &str,
    source: &ChangelogSource,
    cutoff: OffsetDateTime,
) -> PipelineResult<Vec<Item>> {
    let strategy = &source.strategy;
    let entry_sel = compile(&strategy.entry)?;
    let title_sel = compile(&strategy.title)?;
    let date_sel = compile(&strategy.date)?;
    let link_sel = compile("a")?;

    let document = Html::parse_document(html);
    let base = Url::parse(&source.url).ok();
    let page_domain = host_of(&source.url).unwrap_or_default();

    let items = document
        .select(&entry_sel)
        .filter_map(|entry| {
            let date_text = entry
                .select(&date_sel)
                .next()
                .map(|el| el.text().collect::<String>())?;
            let date = parse_entry_date(&date_text)?;
            let published_at = date.midnight().assume_utc();
            if published_at < cutoff {
                return None;
            }

            let title = entry
                .select(&title_sel)
                .next()
                .map(|el| el.text().collect::<String>().trim().to_string())
                .filter(|t| !t.is_empty())?;

            let link = entry
                .select(&link_sel)
                .next()
                .and_then(|a| a.attr("href"))
                .and_then(|href| match &base {
                    Some(base) => base.join(href).ok().map(|u| u.to_string()),
                    None => Some(href.to_string()),
                })
                .unwrap_or_else(|| format!("{}#{}", source.url, date));

            Some(Item {
                source_domain: host_of(&link).unwrap_or_else(|| page_domain.clone()),
                title,
                link,
                published_at,
                summary: String::new(),
                feed_title: source.name.clone(),
                tier: Tier::P0Releases,
                lang: source.lang,
            })
        })
        .collect();
    Ok(items)
}

/// Dates appear as "January 2, 2026", "Jan 2, 2026", "2026-01-02", or
/// "2026.01.02" depending on the vendor.
fn parse_entry_date(raw: &str) -> Option<Date> {
    let cleaned = raw.trim().trim_end_matches('.').replace('\u{a0}', " ");
    let formats = [
        format_description!("[year]-[month]-[day]"),
        format_description!("[year].[month].[day]"),
        format_description!("[month repr:long] [day padding:none], [year]"),
        format_description!("[month repr:short] [day padding:none], [year]"),
    ];
    formats
        .iter()
        .find_map(|fmt| Date::parse(&cleaned, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> ChangelogSource {
        ChangelogSource::new(
            "Test Changelog",
            "https://vendor.example.com/changelog",
            Lang::En,
            "article",
            "h2",
            "time",
        )
    }

    #[test]
    fn date_formats() {
        assert!(parse_entry_date("2026-08-01").is_some());
        assert!(parse_entry_date("2026.08.01").is_some());
        assert!(parse_entry_date("August 1, 2026").is_some());
        assert!(parse_entry_date("Aug 1, 2026").is_some());
        assert!(parse_entry_date("next week").is_none());
    }

    #[test]
    fn parses_entries_newer_than_cutoff() {
        let html = r#"
<html><body>
  <article>
    <time>2046-08-01</time>
    <h2>Projects can now run agents</h2>
    <a href="/changelog/projects-agents">read</a>
  </article>
  <article>
    <time>2001-01-01</time>
    <h2>Ancient entry</h2>
    <a href="/changelog/ancient">read</a>
  </article>
</body></html>"#;

        let cutoff = OffsetDateTime::UNIX_EPOCH + Duration::days(365 * 40);
        let items = parse_entries(html, &source(), cutoff).unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Projects can now run agents");
        assert_eq!(
            items[0].link,
            "https://vendor.example.com/changelog/projects-agents"
        );
        assert_eq!(items[0].tier, Tier::P0Releases);
    }

    #[test]
    fn entry_without_date_is_skipped() {
        let html = "<article><h2>No date here</h2></article>";
        let items = parse_entries(html, &source(), OffsetDateTime::UNIX_EPOCH).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn broken_selector_is_an_error() {
        let mut bad = source();
        bad.strategy.entry = "article[".to_string();
        assert!(parse_entries("<html></html>", &bad, OffsetDateTime::UNIX_EPOCH).is_err());
    }
}
