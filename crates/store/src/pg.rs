use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use time::OffsetDateTime;
use tracing::info;

use common::{Lang, SourceKind};

use crate::{
    CachedKeyword, KeywordRecord, SnapshotMeta, SnapshotStore, SourceRecord,
};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS snapshots (
        snapshot_id TEXT PRIMARY KEY,
        updated_at_utc TIMESTAMPTZ NOT NULL,
        next_update_at_utc TIMESTAMPTZ NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE TABLE IF NOT EXISTS keywords (
        snapshot_id TEXT NOT NULL REFERENCES snapshots(snapshot_id),
        keyword_id TEXT NOT NULL,
        keyword TEXT NOT NULL,
        rank INTEGER NOT NULL,
        delta_rank INTEGER NOT NULL DEFAULT 0,
        is_new BOOLEAN NOT NULL DEFAULT FALSE,
        score DOUBLE PRECISION NOT NULL,
        score_recency DOUBLE PRECISION NOT NULL,
        score_frequency DOUBLE PRECISION NOT NULL,
        score_authority DOUBLE PRECISION NOT NULL,
        score_internal DOUBLE PRECISION NOT NULL,
        summary_short TEXT NOT NULL DEFAULT '',
        summary_short_en TEXT NOT NULL DEFAULT '',
        primary_type TEXT NOT NULL DEFAULT 'news',
        top_source_title TEXT,
        top_source_url TEXT,
        top_source_domain TEXT,
        top_source_image_url TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (snapshot_id, keyword_id)
    )",
    "CREATE INDEX IF NOT EXISTS idx_keywords_snapshot_rank
        ON keywords (snapshot_id, rank)",
    "CREATE TABLE IF NOT EXISTS sources (
        id BIGSERIAL PRIMARY KEY,
        snapshot_id TEXT NOT NULL,
        keyword_id TEXT NOT NULL,
        type TEXT NOT NULL,
        title TEXT NOT NULL,
        url TEXT NOT NULL,
        domain TEXT NOT NULL,
        published_at_utc TIMESTAMPTZ,
        snippet TEXT,
        image_url TEXT NOT NULL,
        title_ko TEXT,
        title_en TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        UNIQUE (snapshot_id, keyword_id, type, url)
    )",
    "CREATE INDEX IF NOT EXISTS idx_sources_snapshot_keyword_type
        ON sources (snapshot_id, keyword_id, type)",
    "CREATE INDEX IF NOT EXISTS idx_sources_snapshot_keyword
        ON sources (snapshot_id, keyword_id)",
    "CREATE TABLE IF NOT EXISTS keyword_aliases (
        canonical_keyword_id TEXT NOT NULL,
        alias TEXT NOT NULL,
        lang TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (canonical_keyword_id, alias)
    )",
    "CREATE TABLE IF NOT EXISTS search_counts (
        query TEXT PRIMARY KEY,
        count BIGINT NOT NULL DEFAULT 0,
        last_searched_at TIMESTAMPTZ
    )",
];

/// Postgres-backed snapshot store.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: PgPool) -> Result<Self> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("schema ready");
        Ok(())
    }

    async fn keyword_payload(
        &self,
        snapshot_id: &str,
        keyword_id: &str,
    ) -> Result<Option<CachedKeyword>> {
        let row = sqlx::query(
            "SELECT keyword, summary_short, summary_short_en
               FROM keywords
              WHERE snapshot_id = $1 AND keyword_id = $2",
        )
        .bind(snapshot_id)
        .bind(keyword_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let sources = sqlx::query(
            "SELECT type, title, url, domain, published_at_utc, snippet,
                    image_url, title_ko, title_en
               FROM sources
              WHERE snapshot_id = $1 AND keyword_id = $2
              ORDER BY id",
        )
        .bind(snapshot_id)
        .bind(keyword_id)
        .fetch_all(&self.pool)
        .await?;

        let sources: Vec<SourceRecord> = sources
            .into_iter()
            .map(|s| SourceRecord {
                snapshot_id: snapshot_id.to_string(),
                keyword_id: keyword_id.to_string(),
                kind: SourceKind::parse(s.get::<String, _>("type").as_str())
                    .unwrap_or(SourceKind::Web),
                title: s.get("title"),
                url: s.get("url"),
                domain: s.get("domain"),
                published_at_utc: s.get::<Option<OffsetDateTime>, _>("published_at_utc"),
                snippet: s.get("snippet"),
                image_url: s.get("image_url"),
                title_ko: s.get("title_ko"),
                title_en: s.get("title_en"),
            })
            .collect();

        if sources.is_empty() {
            return Ok(None);
        }

        Ok(Some(CachedKeyword {
            snapshot_id: snapshot_id.to_string(),
            keyword: row.get("keyword"),
            summary_short: row.get("summary_short"),
            summary_short_en: row.get("summary_short_en"),
            sources,
        }))
    }
}

#[async_trait]
impl SnapshotStore for PgStore {
    async fn insert_snapshot(&self, meta: &SnapshotMeta) -> Result<()> {
        sqlx::query(
            "INSERT INTO snapshots (snapshot_id, updated_at_utc, next_update_at_utc)
             VALUES ($1, $2, $3)
             ON CONFLICT (snapshot_id) DO NOTHING",
        )
        .bind(&meta.snapshot_id)
        .bind(meta.updated_at_utc)
        .bind(meta.next_update_at_utc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_keyword(&self, row: &KeywordRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO keywords (
                snapshot_id, keyword_id, keyword, rank, delta_rank, is_new,
                score, score_recency, score_frequency, score_authority, score_internal,
                summary_short, summary_short_en, primary_type,
                top_source_title, top_source_url, top_source_domain, top_source_image_url
             ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18)
             ON CONFLICT (snapshot_id, keyword_id) DO NOTHING",
        )
        .bind(&row.snapshot_id)
        .bind(&row.keyword_id)
        .bind(&row.keyword)
        .bind(row.rank)
        .bind(row.delta_rank)
        .bind(row.is_new)
        .bind(row.score)
        .bind(row.score_recency)
        .bind(row.score_frequency)
        .bind(row.score_authority)
        .bind(row.score_internal)
        .bind(&row.summary_short)
        .bind(&row.summary_short_en)
        .bind(row.primary_type.as_str())
        .bind(&row.top_source_title)
        .bind(&row.top_source_url)
        .bind(&row.top_source_domain)
        .bind(&row.top_source_image_url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_source(&self, row: &SourceRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO sources (
                snapshot_id, keyword_id, type, title, url, domain,
                published_at_utc, snippet, image_url, title_ko, title_en
             ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
             ON CONFLICT (snapshot_id, keyword_id, type, url) DO UPDATE SET
                title = EXCLUDED.title,
                snippet = EXCLUDED.snippet,
                image_url = EXCLUDED.image_url,
                published_at_utc = EXCLUDED.published_at_utc,
                title_ko = EXCLUDED.title_ko,
                title_en = EXCLUDED.title_en",
        )
        .bind(&row.snapshot_id)
        .bind(&row.keyword_id)
        .bind(row.kind.as_str())
        .bind(&row.title)
        .bind(&row.url)
        .bind(&row.domain)
        .bind(row.published_at_utc)
        .bind(&row.snippet)
        .bind(&row.image_url)
        .bind(&row.title_ko)
        .bind(&row.title_en)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_aliases(&self, keyword_id: &str, aliases: &[(String, Lang)]) -> Result<()> {
        for (alias, lang) in aliases {
            sqlx::query(
                "INSERT INTO keyword_aliases (canonical_keyword_id, alias, lang)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (canonical_keyword_id, alias) DO NOTHING",
            )
            .bind(keyword_id)
            .bind(alias)
            .bind(lang.as_str())
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn previous_ranks(
        &self,
        current_snapshot: &str,
        keyword_ids: &[String],
    ) -> Result<HashMap<String, i32>> {
        if keyword_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query(
            "SELECT DISTINCT ON (k.keyword_id) k.keyword_id, k.rank
               FROM keywords k
               JOIN snapshots s ON s.snapshot_id = k.snapshot_id
              WHERE k.keyword_id = ANY($1) AND k.snapshot_id <> $2
              ORDER BY k.keyword_id, s.created_at DESC",
        )
        .bind(keyword_ids)
        .bind(current_snapshot)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| (r.get::<String, _>("keyword_id"), r.get::<i32, _>("rank")))
            .collect())
    }

    async fn recent_snapshot_ids(&self, current_snapshot: &str, limit: usize) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT snapshot_id FROM snapshots
              WHERE snapshot_id <> $1
              ORDER BY created_at DESC
              LIMIT $2",
        )
        .bind(current_snapshot)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| r.get::<String, _>("snapshot_id"))
            .collect())
    }

    async fn cached_keyword(
        &self,
        keyword_id: &str,
        snapshot_ids: &[String],
    ) -> Result<Option<CachedKeyword>> {
        for snapshot_id in snapshot_ids {
            if let Some(found) = self.keyword_payload(snapshot_id, keyword_id).await? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}
