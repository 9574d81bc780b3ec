use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::debug;

const OG_TIMEOUT: Duration = Duration::from_secs(5);
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Best-effort page-image probe; tests substitute a fixed map.
#[async_trait]
pub trait ImageProbe: Send + Sync {
    async fn og_image(&self, url: &str) -> Option<String>;
}

pub struct OgImageFetcher {
    client: reqwest::Client,
}

impl OgImageFetcher {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .timeout(OG_TIMEOUT)
                .build()?,
        })
    }
}

#[async_trait]
impl ImageProbe for OgImageFetcher {
    async fn og_image(&self, url: &str) -> Option<String> {
        let response = self.client.get(url).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        let html = response.text().await.ok()?;
        let image = extract_og_image(&html);
        if image.is_none() {
            debug!(url, "no page image found");
        }
        image
    }
}

/// Meta-tag priority: `og:image`, then `twitter:image`, then the page icon.
pub fn extract_og_image(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let selectors = [
        (r#"meta[property="og:image"]"#, "content"),
        (r#"meta[name="twitter:image"]"#, "content"),
        (r#"link[rel="icon"]"#, "href"),
        (r#"link[rel="shortcut icon"]"#, "href"),
    ];

    for (selector, attr) in selectors {
        let Ok(sel) = Selector::parse(selector) else {
            continue;
        };
        if let Some(value) = document
            .select(&sel)
            .next()
            .and_then(|el| el.attr(attr))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
        {
            return Some(value);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn og_image_wins_over_twitter_and_icon() {
        let html = r#"<html><head>
            <link rel="icon" href="/favicon.ico">
            <meta name="twitter:image" content="https://cdn.example.com/tw.png">
            <meta property="og:image" content="https://cdn.example.com/og.png">
        </head></html>"#;
        assert_eq!(
            extract_og_image(html).as_deref(),
            Some("https://cdn.example.com/og.png")
        );
    }

    #[test]
    fn falls_back_to_icon() {
        let html = r#"<html><head><link rel="icon" href="/favicon.ico"></head></html>"#;
        assert_eq!(extract_og_image(html).as_deref(), Some("/favicon.ico"));
    }

    #[test]
    fn none_when_no_candidates() {
        assert_eq!(extract_og_image("<html><head></head></html>"), None);
    }
}
