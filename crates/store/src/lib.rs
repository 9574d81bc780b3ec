pub mod memory;
pub mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use time::OffsetDateTime;

use common::{Lang, PrimaryType, SourceKind};

/// Placeholder image used when no real one could be found.
pub const DEFAULT_IMAGE_URL: &str = "/images/default-source.svg";

#[derive(Debug, Clone)]
pub struct SnapshotMeta {
    pub snapshot_id: String,
    pub updated_at_utc: OffsetDateTime,
    pub next_update_at_utc: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct KeywordRecord {
    pub snapshot_id: String,
    pub keyword_id: String,
    pub keyword: String,
    pub rank: i32,
    pub delta_rank: i32,
    pub is_new: bool,
    pub score: f64,
    pub score_recency: f64,
    pub score_frequency: f64,
    pub score_authority: f64,
    pub score_internal: f64,
    pub summary_short: String,
    pub summary_short_en: String,
    pub primary_type: PrimaryType,
    pub top_source_title: Option<String>,
    pub top_source_url: Option<String>,
    pub top_source_domain: Option<String>,
    pub top_source_image_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SourceRecord {
    pub snapshot_id: String,
    pub keyword_id: String,
    pub kind: SourceKind,
    pub title: String,
    pub url: String,
    pub domain: String,
    pub published_at_utc: Option<OffsetDateTime>,
    pub snippet: Option<String>,
    pub image_url: String,
    pub title_ko: Option<String>,
    pub title_en: Option<String>,
}

/// A keyword payload recovered from a recent snapshot, reusable without
/// re-enrichment.
#[derive(Debug, Clone)]
pub struct CachedKeyword {
    pub snapshot_id: String,
    pub keyword: String,
    pub summary_short: String,
    pub summary_short_en: String,
    pub sources: Vec<SourceRecord>,
}

/// Persistence seam for the pipeline. Implemented by [`PgStore`] for
/// production and [`MemoryStore`] for tests.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Idempotent: inserting an existing snapshot id is a no-op.
    async fn insert_snapshot(&self, meta: &SnapshotMeta) -> Result<()>;

    /// Idempotent on `(snapshot_id, keyword_id)`.
    async fn insert_keyword(&self, row: &KeywordRecord) -> Result<()>;

    /// Upsert on `(snapshot_id, keyword_id, type, url)`; mutable fields are
    /// refreshed on conflict.
    async fn upsert_source(&self, row: &SourceRecord) -> Result<()>;

    /// Idempotent on `(canonical_keyword_id, alias)`.
    async fn insert_aliases(&self, keyword_id: &str, aliases: &[(String, Lang)]) -> Result<()>;

    /// Latest prior rank per keyword id, excluding the given snapshot. The
    /// most recent prior snapshot containing the keyword wins.
    async fn previous_ranks(
        &self,
        current_snapshot: &str,
        keyword_ids: &[String],
    ) -> Result<HashMap<String, i32>>;

    /// Most recent snapshot ids, newest first, excluding the given one.
    async fn recent_snapshot_ids(&self, current_snapshot: &str, limit: usize) -> Result<Vec<String>>;

    /// Newest stored payload for a keyword within the given snapshots, only
    /// if it carries at least one source row.
    async fn cached_keyword(
        &self,
        keyword_id: &str,
        snapshot_ids: &[String],
    ) -> Result<Option<CachedKeyword>>;
}

#[async_trait]
impl<S: SnapshotStore + ?Sized> SnapshotStore for Arc<S> {
    async fn insert_snapshot(&self, meta: &SnapshotMeta) -> Result<()> {
        (**self).insert_snapshot(meta).await
    }

    async fn insert_keyword(&self, row: &KeywordRecord) -> Result<()> {
        (**self).insert_keyword(row).await
    }

    async fn upsert_source(&self, row: &SourceRecord) -> Result<()> {
        (**self).upsert_source(row).await
    }

    async fn insert_aliases(&self, keyword_id: &str, aliases: &[(String, Lang)]) -> Result<()> {
        (**self).insert_aliases(keyword_id, aliases).await
    }

    async fn previous_ranks(
        &self,
        current_snapshot: &str,
        keyword_ids: &[String],
    ) -> Result<HashMap<String, i32>> {
        (**self).previous_ranks(current_snapshot, keyword_ids).await
    }

    async fn recent_snapshot_ids(&self, current_snapshot: &str, limit: usize) -> Result<Vec<String>> {
        (**self).recent_snapshot_ids(current_snapshot, limit).await
    }

    async fn cached_keyword(
        &self,
        keyword_id: &str,
        snapshot_ids: &[String],
    ) -> Result<Option<CachedKeyword>> {
        (**self).cached_keyword(keyword_id, snapshot_ids).await
    }
}
