pub mod collector;
pub mod enricher;
pub mod matcher;
pub mod reuse;
pub mod schedule;
pub mod scorer;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{info, warn};

use common::{
    contains_hangul, pool::run_bounded, Config, Lang, PrimaryType, SourceAdapter,
    DEFAULT_WINDOW_HOURS, RANKED_KEYWORDS, REUSE_SNAPSHOT_WINDOW,
};
use extractor::KeywordExtractor;
use openai_chat::ChatApi;
use store::{KeywordRecord, SnapshotMeta, SnapshotStore};
use tavily::{ImageProbe, SearchApi};

use enricher::{Enricher, Enrichment};
use scorer::RankedKeyword;

/// Counters returned to the trigger surface.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub snapshot_id: String,
    pub keyword_count: usize,
    pub reused_count: usize,
    pub new_count: usize,
    pub duration_ms: u64,
}

/// The whole snapshot pipeline, composed over trait seams so tests can run
/// it against fakes end to end.
pub struct Pipeline {
    config: Config,
    adapters: Vec<Arc<dyn SourceAdapter>>,
    store: Arc<dyn SnapshotStore>,
    extractor: KeywordExtractor,
    enricher: Enricher,
    fixed_now: Option<OffsetDateTime>,
}

impl Pipeline {
    pub fn new(
        config: Config,
        adapters: Vec<Arc<dyn SourceAdapter>>,
        store: Arc<dyn SnapshotStore>,
        chat: Arc<dyn ChatApi>,
        search: Arc<dyn SearchApi>,
        images: Arc<dyn ImageProbe>,
    ) -> Self {
        let extractor = KeywordExtractor::new(chat.clone());
        let enricher = Enricher::new(
            search,
            chat,
            images,
            config.enable_en_summary,
            config.summary_context_limit,
        );
        Self {
            config,
            adapters,
            store,
            extractor,
            enricher,
            fixed_now: None,
        }
    }

    /// Pin the pipeline clock. Used by tests that need a stable snapshot id.
    pub fn with_fixed_clock(mut self, at: OffsetDateTime) -> Self {
        self.fixed_now = Some(at);
        self
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let started = Instant::now();
        let now = self.fixed_now.unwrap_or_else(OffsetDateTime::now_utc);
        let snapshot_id = schedule::snapshot_id(now);
        info!(%snapshot_id, "pipeline run started");

        let items = collector::collect_all(&self.adapters, DEFAULT_WINDOW_HOURS).await;
        info!("collected {} deduplicated items", items.len());

        let extracted = self.extractor.extract(&items).await;
        let matched = matcher::match_keywords(extracted, &items);
        info!("{} keywords with support", matched.len());

        let scored: Vec<_> = matched
            .into_iter()
            .map(|keyword| {
                let scores = scorer::score_candidate(&keyword.candidate, now);
                (keyword, scores)
            })
            .collect();

        let ids: Vec<String> = scored.iter().map(|(k, _)| k.keyword_id.clone()).collect();
        let previous = self.store.previous_ranks(&snapshot_id, &ids).await?;
        let ranked = scorer::rank_keywords(scored, &previous, RANKED_KEYWORDS);

        // The snapshot row must be observable before any keyword row.
        let meta = SnapshotMeta {
            snapshot_id: snapshot_id.clone(),
            updated_at_utc: now,
            next_update_at_utc: schedule::next_update_at(now, &self.config.schedule_utc),
        };
        self.store.insert_snapshot(&meta).await?;

        let recent = Arc::new(
            self.store
                .recent_snapshot_ids(&snapshot_id, REUSE_SNAPSHOT_WINDOW)
                .await
                .unwrap_or_else(|e| {
                    warn!("recent snapshot lookup failed: {}", e);
                    Vec::new()
                }),
        );

        let mut ranked = ranked;
        let detailed_count = self.config.detailed_keywords.min(ranked.len());
        let lightweight = ranked.split_off(detailed_count);
        let detailed = ranked;

        let ctx = KeywordCtx {
            store: self.store.clone(),
            enricher: self.enricher.clone(),
            snapshot_id: snapshot_id.clone(),
            recent,
        };
        let detailed_outcomes = run_bounded(
            self.config.keyword_concurrency,
            detailed,
            move |keyword| {
                let ctx = ctx.clone();
                async move { process_detailed(ctx, keyword).await }
            },
        )
        .await;

        let store = self.store.clone();
        let light_snapshot = snapshot_id.clone();
        let light_outcomes = run_bounded(
            self.config.lightweight_concurrency,
            lightweight,
            move |keyword| {
                let store = store.clone();
                let snapshot_id = light_snapshot.clone();
                async move { insert_lightweight(store, snapshot_id, keyword).await }
            },
        )
        .await;

        let mut keyword_count = 0;
        let mut reused_count = 0;
        let mut new_count = 0;
        for outcome in detailed_outcomes.iter().chain(light_outcomes.iter()) {
            if outcome.persisted {
                keyword_count += 1;
                if outcome.reused {
                    reused_count += 1;
                }
                if outcome.is_new {
                    new_count += 1;
                }
            }
        }

        let summary = RunSummary {
            snapshot_id,
            keyword_count,
            reused_count,
            new_count,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            "run finished: {} keywords ({} reused, {} new) in {}ms",
            summary.keyword_count, summary.reused_count, summary.new_count, summary.duration_ms
        );
        Ok(summary)
    }
}

#[derive(Clone)]
struct KeywordCtx {
    store: Arc<dyn SnapshotStore>,
    enricher: Enricher,
    snapshot_id: String,
    recent: Arc<Vec<String>>,
}

struct KeywordOutcome {
    persisted: bool,
    reused: bool,
    is_new: bool,
}

impl KeywordOutcome {
    fn failed() -> Self {
        Self {
            persisted: false,
            reused: false,
            is_new: false,
        }
    }
}

/// Full treatment for one top-D keyword: reuse cache first, enrichment
/// otherwise, then keyword row, source rows, aliases. A failure here never
/// aborts the run.
async fn process_detailed(ctx: KeywordCtx, ranked: RankedKeyword) -> KeywordOutcome {
    let keyword_id = ranked.keyword.keyword_id.clone();

    let cached = match ctx.store.cached_keyword(&keyword_id, &ctx.recent).await {
        Ok(found) => found,
        Err(e) => {
            warn!("reuse lookup for '{}' failed: {}", keyword_id, e);
            None
        }
    };

    let reused = cached.is_some();
    let enrichment = match cached {
        Some(cached) => {
            info!("reusing cached payload for '{}'", keyword_id);
            reuse::enrichment_from_cached(cached, &ctx.snapshot_id, &keyword_id)
        }
        None => {
            ctx.enricher
                .enrich(&ctx.snapshot_id, &keyword_id, &ranked.keyword.keyword)
                .await
        }
    };

    let row = keyword_record(&ctx.snapshot_id, &ranked, Some(&enrichment));
    if let Err(e) = ctx.store.insert_keyword(&row).await {
        warn!("keyword '{}' insert failed: {}", keyword_id, e);
        return KeywordOutcome::failed();
    }

    // Source order within a keyword does not matter; run the upserts together.
    let results =
        futures::future::join_all(enrichment.sources.iter().map(|s| ctx.store.upsert_source(s)))
            .await;
    for result in results {
        if let Err(e) = result {
            warn!("source insert for '{}' failed: {}", keyword_id, e);
        }
    }

    let aliases: Vec<(String, Lang)> = ranked
        .keyword
        .aliases
        .iter()
        .map(|alias| {
            let lang = if contains_hangul(alias) { Lang::Ko } else { Lang::En };
            (alias.clone(), lang)
        })
        .collect();
    if !aliases.is_empty() {
        if let Err(e) = ctx.store.insert_aliases(&keyword_id, &aliases).await {
            warn!("alias insert for '{}' failed: {}", keyword_id, e);
        }
    }

    KeywordOutcome {
        persisted: true,
        reused,
        is_new: ranked.is_new,
    }
}

/// Positions D+1..R: ranking data only, so the search surface can still
/// reference the keyword.
async fn insert_lightweight(
    store: Arc<dyn SnapshotStore>,
    snapshot_id: String,
    ranked: RankedKeyword,
) -> KeywordOutcome {
    let row = keyword_record(&snapshot_id, &ranked, None);
    match store.insert_keyword(&row).await {
        Ok(()) => KeywordOutcome {
            persisted: true,
            reused: false,
            is_new: ranked.is_new,
        },
        Err(e) => {
            warn!(
                "lightweight keyword '{}' insert failed: {}",
                ranked.keyword.keyword_id, e
            );
            KeywordOutcome::failed()
        }
    }
}

fn keyword_record(
    snapshot_id: &str,
    ranked: &RankedKeyword,
    enrichment: Option<&Enrichment>,
) -> KeywordRecord {
    let scores = &ranked.scores;
    let (summary_ko, summary_en, primary_type, top) = match enrichment {
        Some(e) => (
            e.summary_ko.clone(),
            e.summary_en.clone(),
            e.primary_type,
            e.top_source.clone(),
        ),
        None => (String::new(), String::new(), PrimaryType::News, None),
    };

    KeywordRecord {
        snapshot_id: snapshot_id.to_string(),
        keyword_id: ranked.keyword.keyword_id.clone(),
        keyword: ranked.keyword.keyword.clone(),
        rank: ranked.rank,
        delta_rank: ranked.delta_rank,
        is_new: ranked.is_new,
        score: scorer::round4(scores.total),
        score_recency: scorer::round4(scores.recency),
        score_frequency: scorer::round4(scores.frequency),
        score_authority: scorer::round4(scores.authority),
        score_internal: scorer::round4(scores.internal),
        summary_short: summary_ko,
        summary_short_en: summary_en,
        primary_type,
        top_source_title: top.as_ref().map(|t| t.title.clone()),
        top_source_url: top.as_ref().map(|t| t.url.clone()),
        top_source_domain: top.as_ref().map(|t| t.domain.clone()),
        top_source_image_url: top.map(|t| t.image_url),
    }
}
