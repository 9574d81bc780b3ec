use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use common::Lang;

use crate::{CachedKeyword, KeywordRecord, SnapshotMeta, SnapshotStore, SourceRecord};

/// In-memory store with the same conflict semantics as the Postgres
/// implementation. Thread-safe; used by the pipeline test harness.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    snapshots: Vec<SnapshotMeta>,
    keywords: Vec<KeywordRecord>,
    sources: Vec<SourceRecord>,
    aliases: Vec<(String, String, Lang)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> Vec<SnapshotMeta> {
        self.inner.lock().unwrap().snapshots.clone()
    }

    pub fn keywords(&self) -> Vec<KeywordRecord> {
        self.inner.lock().unwrap().keywords.clone()
    }

    pub fn keywords_for(&self, snapshot_id: &str) -> Vec<KeywordRecord> {
        let mut rows: Vec<KeywordRecord> = self
            .inner
            .lock()
            .unwrap()
            .keywords
            .iter()
            .filter(|k| k.snapshot_id == snapshot_id)
            .cloned()
            .collect();
        rows.sort_by_key(|k| k.rank);
        rows
    }

    pub fn sources(&self) -> Vec<SourceRecord> {
        self.inner.lock().unwrap().sources.clone()
    }

    pub fn aliases(&self) -> Vec<(String, String, Lang)> {
        self.inner.lock().unwrap().aliases.clone()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn insert_snapshot(&self, meta: &SnapshotMeta) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner
            .snapshots
            .iter()
            .any(|s| s.snapshot_id == meta.snapshot_id)
        {
            inner.snapshots.push(meta.clone());
        }
        Ok(())
    }

    async fn insert_keyword(&self, row: &KeywordRecord) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner
            .keywords
            .iter()
            .any(|k| k.snapshot_id == row.snapshot_id && k.keyword_id == row.keyword_id)
        {
            inner.keywords.push(row.clone());
        }
        Ok(())
    }

    async fn upsert_source(&self, row: &SourceRecord) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        match inner.sources.iter_mut().find(|s| {
            s.snapshot_id == row.snapshot_id
                && s.keyword_id == row.keyword_id
                && s.kind == row.kind
                && s.url == row.url
        }) {
            Some(existing) => {
                existing.title = row.title.clone();
                existing.snippet = row.snippet.clone();
                existing.image_url = row.image_url.clone();
                existing.published_at_utc = row.published_at_utc;
                existing.title_ko = row.title_ko.clone();
                existing.title_en = row.title_en.clone();
            }
            None => inner.sources.push(row.clone()),
        }
        Ok(())
    }

    async fn insert_aliases(&self, keyword_id: &str, aliases: &[(String, Lang)]) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        for (alias, lang) in aliases {
            if !inner
                .aliases
                .iter()
                .any(|(id, a, _)| id == keyword_id && a == alias)
            {
                inner
                    .aliases
                    .push((keyword_id.to_string(), alias.clone(), *lang));
            }
        }
        Ok(())
    }

    async fn previous_ranks(
        &self,
        current_snapshot: &str,
        keyword_ids: &[String],
    ) -> Result<HashMap<String, i32>> {
        let inner = self.inner.lock().unwrap();
        // Snapshots are appended in creation order; walk newest first.
        let mut ranks = HashMap::new();
        for snapshot in inner.snapshots.iter().rev() {
            if snapshot.snapshot_id == current_snapshot {
                continue;
            }
            for keyword_id in keyword_ids {
                if ranks.contains_key(keyword_id) {
                    continue;
                }
                if let Some(row) = inner.keywords.iter().find(|k| {
                    k.snapshot_id == snapshot.snapshot_id && &k.keyword_id == keyword_id
                }) {
                    ranks.insert(keyword_id.clone(), row.rank);
                }
            }
        }
        Ok(ranks)
    }

    async fn recent_snapshot_ids(&self, current_snapshot: &str, limit: usize) -> Result<Vec<String>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .snapshots
            .iter()
            .rev()
            .filter(|s| s.snapshot_id != current_snapshot)
            .take(limit)
            .map(|s| s.snapshot_id.clone())
            .collect())
    }

    async fn cached_keyword(
        &self,
        keyword_id: &str,
        snapshot_ids: &[String],
    ) -> Result<Option<CachedKeyword>> {
        let inner = self.inner.lock().unwrap();
        for snapshot_id in snapshot_ids {
            let Some(row) = inner
                .keywords
                .iter()
                .find(|k| &k.snapshot_id == snapshot_id && k.keyword_id == keyword_id)
            else {
                continue;
            };
            let sources: Vec<SourceRecord> = inner
                .sources
                .iter()
                .filter(|s| &s.snapshot_id == snapshot_id && s.keyword_id == keyword_id)
                .cloned()
                .collect();
            if sources.is_empty() {
                continue;
            }
            return Ok(Some(CachedKeyword {
                snapshot_id: snapshot_id.clone(),
                keyword: row.keyword.clone(),
                summary_short: row.summary_short.clone(),
                summary_short_en: row.summary_short_en.clone(),
                sources,
            }));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::PrimaryType;
    use time::OffsetDateTime;

    fn snapshot(id: &str) -> SnapshotMeta {
        SnapshotMeta {
            snapshot_id: id.to_string(),
            updated_at_utc: OffsetDateTime::UNIX_EPOCH,
            next_update_at_utc: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn keyword(snapshot_id: &str, keyword_id: &str, rank: i32) -> KeywordRecord {
        KeywordRecord {
            snapshot_id: snapshot_id.to_string(),
            keyword_id: keyword_id.to_string(),
            keyword: keyword_id.to_string(),
            rank,
            delta_rank: 0,
            is_new: true,
            score: 0.5,
            score_recency: 0.5,
            score_frequency: 0.5,
            score_authority: 0.5,
            score_internal: 0.0,
            summary_short: "요약".to_string(),
            summary_short_en: "summary".to_string(),
            primary_type: PrimaryType::News,
            top_source_title: None,
            top_source_url: None,
            top_source_domain: None,
            top_source_image_url: None,
        }
    }

    fn source(snapshot_id: &str, keyword_id: &str, url: &str) -> SourceRecord {
        SourceRecord {
            snapshot_id: snapshot_id.to_string(),
            keyword_id: keyword_id.to_string(),
            kind: common::SourceKind::News,
            title: "t".to_string(),
            url: url.to_string(),
            domain: "example.com".to_string(),
            published_at_utc: None,
            snippet: None,
            image_url: crate::DEFAULT_IMAGE_URL.to_string(),
            title_ko: None,
            title_en: None,
        }
    }

    #[tokio::test]
    async fn duplicate_inserts_are_absorbed() {
        let store = MemoryStore::new();
        store.insert_snapshot(&snapshot("s1")).await.unwrap();
        store.insert_snapshot(&snapshot("s1")).await.unwrap();
        store.insert_keyword(&keyword("s1", "gpt_5", 1)).await.unwrap();
        store.insert_keyword(&keyword("s1", "gpt_5", 2)).await.unwrap();

        assert_eq!(store.snapshots().len(), 1);
        let rows = store.keywords();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].rank, 1);
    }

    #[tokio::test]
    async fn source_upsert_refreshes_mutable_fields() {
        let store = MemoryStore::new();
        store
            .upsert_source(&source("s1", "gpt_5", "https://a"))
            .await
            .unwrap();
        let mut updated = source("s1", "gpt_5", "https://a");
        updated.image_url = "https://cdn/x.png".to_string();
        store.upsert_source(&updated).await.unwrap();

        let sources = store.sources();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].image_url, "https://cdn/x.png");
    }

    #[tokio::test]
    async fn previous_ranks_prefer_most_recent_snapshot() {
        let store = MemoryStore::new();
        store.insert_snapshot(&snapshot("s1")).await.unwrap();
        store.insert_snapshot(&snapshot("s2")).await.unwrap();
        store.insert_keyword(&keyword("s1", "gpt_5", 7)).await.unwrap();
        store.insert_keyword(&keyword("s2", "gpt_5", 2)).await.unwrap();

        let ranks = store
            .previous_ranks("s3", &["gpt_5".to_string()])
            .await
            .unwrap();
        assert_eq!(ranks.get("gpt_5"), Some(&2));
    }

    #[tokio::test]
    async fn cached_keyword_requires_sources() {
        let store = MemoryStore::new();
        store.insert_snapshot(&snapshot("s1")).await.unwrap();
        store.insert_keyword(&keyword("s1", "gpt_5", 1)).await.unwrap();

        let ids = vec!["s1".to_string()];
        assert!(store.cached_keyword("gpt_5", &ids).await.unwrap().is_none());

        store
            .upsert_source(&source("s1", "gpt_5", "https://a"))
            .await
            .unwrap();
        let cached = store.cached_keyword("gpt_5", &ids).await.unwrap().unwrap();
        assert_eq!(cached.snapshot_id, "s1");
        assert_eq!(cached.sources.len(), 1);
    }
}
