use common::SourceKind;
use store::{CachedKeyword, SourceRecord, DEFAULT_IMAGE_URL};

use crate::enricher::{primary_type_of_records, Enrichment, TopSource};

/// Turn a payload cached from a recent snapshot into an enrichment for the
/// current one: sources re-keyed, primary type re-voted, top source
/// re-projected. External search and the summarizer are never touched.
pub fn enrichment_from_cached(
    cached: CachedKeyword,
    snapshot_id: &str,
    keyword_id: &str,
) -> Enrichment {
    let sources: Vec<SourceRecord> = cached
        .sources
        .into_iter()
        .map(|mut source| {
            source.snapshot_id = snapshot_id.to_string();
            source.keyword_id = keyword_id.to_string();
            source
        })
        .collect();

    let primary_type = primary_type_of_records(&sources);

    let top = sources
        .iter()
        .find(|s| s.kind == SourceKind::News)
        .or_else(|| sources.first())
        .map(|s| TopSource {
            title: s.title.clone(),
            url: s.url.clone(),
            domain: s.domain.clone(),
            image_url: if s.image_url.is_empty() {
                DEFAULT_IMAGE_URL.to_string()
            } else {
                s.image_url.clone()
            },
        });

    Enrichment {
        summary_ko: cached.summary_short,
        summary_en: cached.summary_short_en,
        primary_type,
        top_source: top,
        sources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::PrimaryType;

    fn cached_source(kind: SourceKind, url: &str) -> SourceRecord {
        SourceRecord {
            snapshot_id: "old".to_string(),
            keyword_id: "gpt_5".to_string(),
            kind,
            title: "title".to_string(),
            url: url.to_string(),
            domain: "techcrunch.com".to_string(),
            published_at_utc: None,
            snippet: None,
            image_url: "https://cdn.example.com/a.png".to_string(),
            title_ko: Some("제목".to_string()),
            title_en: Some("title".to_string()),
        }
    }

    #[test]
    fn cached_payload_is_rekeyed_to_current_snapshot() {
        let cached = CachedKeyword {
            snapshot_id: "old".to_string(),
            keyword: "GPT-5".to_string(),
            summary_short: "요약".to_string(),
            summary_short_en: "summary".to_string(),
            sources: vec![
                cached_source(SourceKind::Web, "https://techcrunch.com/b"),
                cached_source(SourceKind::News, "https://techcrunch.com/a"),
            ],
        };

        let enrichment = enrichment_from_cached(cached, "new", "gpt_5");

        assert!(enrichment.sources.iter().all(|s| s.snapshot_id == "new"));
        assert_eq!(enrichment.summary_ko, "요약");
        assert_eq!(enrichment.primary_type, PrimaryType::News);
        // Top source prefers the news row even when it is not first.
        assert_eq!(
            enrichment.top_source.as_ref().unwrap().url,
            "https://techcrunch.com/a"
        );
    }
}
