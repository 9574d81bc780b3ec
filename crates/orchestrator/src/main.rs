use std::env;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use changelog::ChangelogAdapter;
use common::{Config, SourceAdapter};
use feeds::{RssFeedAdapter, YoutubeFeedAdapter};
use gdelt::GdeltAdapter;
use github::{GithubClient, GithubReleasesAdapter, GithubSearchAdapter, MarkdownListingAdapter};
use hacker_news::HackerNewsAdapter;
use openai_chat::{ChatApi, ChatClient, DisabledChat};
use pipeline::{Pipeline, RunSummary};
use store::{PgStore, SnapshotStore};
use tavily::{DisabledSearch, OgImageFetcher, SearchApi, TavilyClient};

struct AppState {
    pipeline: Pipeline,
    cron_secret: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn SnapshotStore> = Arc::new(PgStore::connect(&config.database_url).await?);

    let chat: Arc<dyn ChatApi> = match &config.openai_api_key {
        Some(key) => Arc::new(ChatClient::new(key, &config.openai_model)?),
        None => {
            warn!("OPENAI_API_KEY not set; extraction falls back to token scan");
            Arc::new(DisabledChat)
        }
    };

    let search: Arc<dyn SearchApi> = match &config.tavily_api_key {
        Some(key) => Arc::new(TavilyClient::new(key)?),
        None => {
            warn!("TAVILY_API_KEY not set; enrichment search disabled");
            Arc::new(DisabledSearch)
        }
    };

    let images = Arc::new(OgImageFetcher::new()?);

    let pipeline = Pipeline::new(
        config.clone(),
        build_adapters(&config)?,
        store,
        chat,
        search,
        images,
    );

    if env::args().any(|arg| arg == "--once") {
        let summary = pipeline.run().await?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let state = Arc::new(AppState {
        pipeline,
        cron_secret: config.cron_secret.clone(),
    });

    let app = Router::new()
        .route("/api/refresh", post(refresh_handler))
        .route("/health", get(health))
        .with_state(state);

    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("listening on port {}", port);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Adapter order is the collector's dedup priority: curated feeds, curated
/// briefs, releases, changelogs, YouTube, HN, GDELT, GitHub search.
fn build_adapters(config: &Config) -> Result<Vec<Arc<dyn SourceAdapter>>> {
    let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::new();

    adapters.push(Arc::new(RssFeedAdapter::with_catalog()?));

    let github_client = match &config.github_token {
        Some(token) => Some(GithubClient::new(token)?),
        None => {
            warn!("GITHUB_TOKEN not set; skipping GitHub adapters");
            None
        }
    };

    if let Some(client) = &github_client {
        adapters.push(Arc::new(MarkdownListingAdapter::new(client.clone())));
        adapters.push(Arc::new(GithubReleasesAdapter::new(client.clone())));
    }

    adapters.push(Arc::new(ChangelogAdapter::with_catalog()?));
    adapters.push(Arc::new(YoutubeFeedAdapter::with_catalog()?));
    adapters.push(Arc::new(HackerNewsAdapter::new()?));
    adapters.push(Arc::new(GdeltAdapter::new()?));

    if let Some(client) = github_client {
        adapters.push(Arc::new(GithubSearchAdapter::new(client)));
    }

    Ok(adapters)
}

async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Some(secret) = &state.cron_secret {
        let expected = format!("Bearer {secret}");
        let authorized = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(|v| v == expected)
            .unwrap_or(false);
        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"error": "unauthorized"})),
            );
        }
    }

    match state.pipeline.run().await {
        Ok(summary) => (StatusCode::OK, Json(success_body(&summary))),
        Err(e) => {
            warn!("pipeline run failed: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": "pipeline run failed",
                    "detail": e.to_string(),
                })),
            )
        }
    }
}

fn success_body(summary: &RunSummary) -> serde_json::Value {
    serde_json::json!({
        "ok": true,
        "snapshotId": summary.snapshot_id,
        "keywordCount": summary.keyword_count,
        "reusedCount": summary.reused_count,
        "newCount": summary.new_count,
        "durationMs": summary.duration_ms,
    })
}

async fn health() -> &'static str {
    "ok"
}
