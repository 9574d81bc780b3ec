use async_trait::async_trait;
use serde::Deserialize;
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};
use tokio::task::JoinSet;
use tracing::warn;

use common::{truncate_chars, Item, Lang, SourceAdapter, Tier};

use crate::client::GithubClient;

/// Repositories whose releases feed the context tier.
const TRACKED_REPOS: [&str; 7] = [
    "huggingface/transformers",
    "langchain-ai/langchain",
    "vllm-project/vllm",
    "ollama/ollama",
    "ggml-org/llama.cpp",
    "openai/openai-python",
    "anthropics/anthropic-sdk-python",
];

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    name: Option<String>,
    html_url: String,
    published_at: Option<String>,
    body: Option<String>,
}

/// Recent releases of tracked AI repositories.
pub struct GithubReleasesAdapter {
    client: GithubClient,
    repos: Vec<String>,
}

impl GithubReleasesAdapter {
    pub fn new(client: GithubClient) -> Self {
        Self {
            client,
            repos: TRACKED_REPOS.iter().map(|r| r.to_string()).collect(),
        }
    }

    fn item_from_release(repo: &str, release: Release, cutoff: OffsetDateTime) -> Option<Item> {
        let published_at =
            OffsetDateTime::parse(release.published_at.as_deref()?, &Rfc3339).ok()?;
        if published_at < cutoff {
            return None;
        }

        let label = match release.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => release.tag_name.clone(),
        };

        Some(Item {
            title: format!("{repo} {label}"),
            link: release.html_url,
            published_at,
            summary: release
                .body
                .map(|b| truncate_chars(b.trim(), 500))
                .unwrap_or_default(),
            source_domain: "github.com".to_string(),
            feed_title: "GitHub Releases".to_string(),
            tier: Tier::P1Context,
            lang: Lang::En,
        })
    }
}

#[async_trait]
impl SourceAdapter for GithubReleasesAdapter {
    fn name(&self) -> &'static str {
        "github_releases"
    }

    async fn collect(&self, window_hours: i64) -> Vec<Item> {
        let cutoff = OffsetDateTime::now_utc() - Duration::hours(window_hours);
        let mut tasks = JoinSet::new();

        for repo in &self.repos {
            let client = self.client.clone();
            let repo = repo.clone();
            tasks.spawn(async move {
                let path = format!("/repos/{repo}/releases");
                let result: common::PipelineResult<Option<Vec<Release>>> =
                    client.get_json(&path, &[("per_page", "5")]).await;
                (repo, result)
            });
        }

        let mut items = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((repo, Ok(Some(releases)))) => {
                    items.extend(
                        releases
                            .into_iter()
                            .filter_map(|r| Self::item_from_release(&repo, r, cutoff)),
                    );
                }
                Ok((_, Ok(None))) => {}
                Ok((repo, Err(e))) => warn!("releases for '{}' failed: {}", repo, e),
                Err(e) => warn!("release task failed: {}", e),
            }
        }
        items
    }
}
