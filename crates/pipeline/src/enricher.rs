use std::collections::HashMap;
use std::sync::Arc;
use std::sync::LazyLock;

use tracing::warn;

use common::{host_of, pool::run_bounded, truncate_chars, PrimaryType, SourceKind};
use openai_chat::ChatApi;
use store::{SourceRecord, DEFAULT_IMAGE_URL};
use tavily::{ImageProbe, SearchApi, SearchHit};

const SUMMARY_MAX_CHARS: usize = 220;
const SUMMARY_TEMPERATURE: f32 = 0.2;
const TRANSLATION_TEMPERATURE: f32 = 0.1;
const OG_BACKFILL_LIMIT: usize = 10;
const OG_CONCURRENCY: usize = 5;
const TRANSLATED_TITLES_PER_KIND: usize = 8;

const SUMMARY_SYSTEM_KO: &str = "당신은 AI 트렌드 요약 작성자입니다. 제공된 출처를 바탕으로 \
키워드에 대한 한국어 요약을 220자 이내의 한 문장으로 작성하세요. 이모지, 불릿, 줄바꿈 없이 \
산문 한 줄로만 답하세요.";

const SUMMARY_SYSTEM_EN: &str = "You write one-line AI trend summaries. Using the provided \
sources, summarize the keyword in a single English sentence of at most 220 characters. \
No emoji, no bullets, no line breaks.";

const TRANSLATE_SYSTEM: &str = "Translate each numbered line into natural Korean. Keep proper \
nouns, product names, and version numbers untranslated. Return exactly one numbered line per \
input line and nothing else.";

static SOCIAL_HOSTS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    vec![
        "twitter.com",
        "x.com",
        "facebook.com",
        "instagram.com",
        "reddit.com",
        "threads.net",
        "linkedin.com",
        "news.ycombinator.com",
    ]
});

static DATA_HOSTS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    vec![
        "arxiv.org",
        "paperswithcode.com",
        "huggingface.co",
        "github.com",
        "kaggle.com",
    ]
});

/// Top-source projection denormalized onto the keyword row.
#[derive(Debug, Clone)]
pub struct TopSource {
    pub title: String,
    pub url: String,
    pub domain: String,
    pub image_url: String,
}

/// Everything enrichment produces for one keyword.
#[derive(Debug)]
pub struct Enrichment {
    pub summary_ko: String,
    pub summary_en: String,
    pub primary_type: PrimaryType,
    pub top_source: Option<TopSource>,
    pub sources: Vec<SourceRecord>,
}

#[derive(Clone)]
pub struct Enricher {
    search: Arc<dyn SearchApi>,
    chat: Arc<dyn ChatApi>,
    images: Arc<dyn ImageProbe>,
    enable_en_summary: bool,
    summary_context_limit: usize,
}

impl Enricher {
    pub fn new(
        search: Arc<dyn SearchApi>,
        chat: Arc<dyn ChatApi>,
        images: Arc<dyn ImageProbe>,
        enable_en_summary: bool,
        summary_context_limit: usize,
    ) -> Self {
        Self {
            search,
            chat,
            images,
            enable_en_summary,
            summary_context_limit,
        }
    }

    pub async fn enrich(&self, snapshot_id: &str, keyword_id: &str, keyword: &str) -> Enrichment {
        let mut flat = self.search_groups(keyword).await;
        self.backfill_images(&mut flat).await;

        let context = summary_context(&flat, self.summary_context_limit);
        let source_count = flat.len();

        let (summary_ko, summary_en) = tokio::join!(
            self.summarize(keyword, &context, source_count, true),
            async {
                if self.enable_en_summary {
                    self.summarize(keyword, &context, source_count, false).await
                } else {
                    String::new()
                }
            }
        );

        let translations = self.translate_titles(&flat).await;

        let primary_type = primary_type_of(&flat);
        let top_source = flat.first().map(|(_, hit)| TopSource {
            title: hit.title.clone(),
            url: hit.url.clone(),
            domain: host_of(&hit.url).unwrap_or_default(),
            image_url: hit
                .image_url
                .clone()
                .unwrap_or_else(|| DEFAULT_IMAGE_URL.to_string()),
        });

        let sources = flat
            .into_iter()
            .enumerate()
            .map(|(index, (kind, hit))| SourceRecord {
                snapshot_id: snapshot_id.to_string(),
                keyword_id: keyword_id.to_string(),
                kind,
                domain: host_of(&hit.url).unwrap_or_default(),
                title_ko: translations.get(&index).cloned(),
                title_en: Some(hit.title.clone()),
                title: hit.title,
                url: hit.url,
                published_at_utc: hit.published_at,
                snippet: hit.snippet,
                image_url: hit
                    .image_url
                    .unwrap_or_else(|| DEFAULT_IMAGE_URL.to_string()),
            })
            .collect();

        Enrichment {
            summary_ko,
            summary_en,
            primary_type,
            top_source,
            sources,
        }
    }

    /// One query per source kind, concurrently; a failed group is empty.
    async fn search_groups(&self, keyword: &str) -> Vec<(SourceKind, SearchHit)> {
        let queries = SourceKind::ALL.map(|kind| {
            let search = self.search.clone();
            let query = keyword.to_string();
            async move {
                match search.search(&query, kind).await {
                    Ok(hits) => (kind, hits),
                    Err(e) => {
                        warn!(kind = kind.as_str(), "search failed: {}", e);
                        (kind, Vec::new())
                    }
                }
            }
        });

        let groups = futures::future::join_all(queries).await;
        groups
            .into_iter()
            .flat_map(|(kind, hits)| hits.into_iter().map(move |h| (kind, h)))
            .collect()
    }

    /// Scrape page images for the first few sources that lack one.
    async fn backfill_images(&self, flat: &mut [(SourceKind, SearchHit)]) {
        let missing: Vec<(usize, String)> = flat
            .iter()
            .enumerate()
            .filter(|(_, (_, hit))| hit.image_url.is_none())
            .map(|(index, (_, hit))| (index, hit.url.clone()))
            .take(OG_BACKFILL_LIMIT)
            .collect();

        let images = self.images.clone();
        let fetched = run_bounded(OG_CONCURRENCY, missing, move |(index, url)| {
            let images = images.clone();
            async move { (index, images.og_image(&url).await) }
        })
        .await;

        for (index, image) in fetched {
            if let Some(image) = image {
                flat[index].1.image_url = Some(image);
            }
        }
    }

    /// One-line summary with a templated fallback on any model failure.
    async fn summarize(
        &self,
        keyword: &str,
        context: &str,
        source_count: usize,
        korean: bool,
    ) -> String {
        let system = if korean {
            SUMMARY_SYSTEM_KO
        } else {
            SUMMARY_SYSTEM_EN
        };
        let user = format!("Keyword: {keyword}\nSources:\n{context}");

        match self.chat.chat(system, &user, SUMMARY_TEMPERATURE).await {
            Ok(raw) => {
                let cleaned = sanitize_summary(&raw);
                if cleaned.is_empty() {
                    fallback_summary(keyword, source_count, korean)
                } else {
                    cleaned
                }
            }
            Err(e) => {
                warn!("summary failed: {}", e);
                fallback_summary(keyword, source_count, korean)
            }
        }
    }

    /// Batch-translate the leading titles of each textual group into Korean.
    /// Returns a flat-index -> Korean title map; a miscounted response keeps
    /// the originals.
    async fn translate_titles(
        &self,
        flat: &[(SourceKind, SearchHit)],
    ) -> HashMap<usize, String> {
        let mut out = HashMap::new();

        for kind in [SourceKind::News, SourceKind::Web, SourceKind::Video] {
            let batch: Vec<(usize, &str)> = flat
                .iter()
                .enumerate()
                .filter(|(_, (k, _))| *k == kind)
                .map(|(index, (_, hit))| (index, hit.title.as_str()))
                .take(TRANSLATED_TITLES_PER_KIND)
                .collect();

            if batch.is_empty() {
                continue;
            }

            let user = batch
                .iter()
                .enumerate()
                .map(|(line, (_, title))| format!("{}. {}", line + 1, title))
                .collect::<Vec<_>>()
                .join("\n");

            match self.chat.chat(TRANSLATE_SYSTEM, &user, TRANSLATION_TEMPERATURE).await {
                Ok(response) => {
                    if let Some(lines) = parse_numbered_lines(&response, batch.len()) {
                        for ((index, _), translated) in batch.iter().zip(lines) {
                            out.insert(*index, translated);
                        }
                    } else {
                        warn!(kind = kind.as_str(), "translation line count mismatch");
                    }
                }
                Err(e) => warn!(kind = kind.as_str(), "translation failed: {}", e),
            }
        }
        out
    }
}

/// First N news hits, or first N of everything when no news came back.
fn summary_context(flat: &[(SourceKind, SearchHit)], limit: usize) -> String {
    let news: Vec<&SearchHit> = flat
        .iter()
        .filter(|(kind, _)| *kind == SourceKind::News)
        .map(|(_, hit)| hit)
        .take(limit)
        .collect();

    let picked: Vec<&SearchHit> = if news.is_empty() {
        flat.iter().map(|(_, hit)| hit).take(limit).collect()
    } else {
        news
    };

    picked
        .iter()
        .map(|hit| {
            let snippet = hit
                .snippet
                .as_deref()
                .map(|s| truncate_chars(s, 200))
                .unwrap_or_default();
            format!("- {}: {}", hit.title, snippet)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn fallback_summary(keyword: &str, source_count: usize, korean: bool) -> String {
    if korean {
        format!("{keyword} 관련 소식 {source_count}건이 최근 출처에서 확인되었습니다.")
    } else {
        format!("{source_count} recent sources mention {keyword}.")
    }
}

/// Enforce the output contract: no emoji, single prose line, bounded length.
pub fn sanitize_summary(raw: &str) -> String {
    let no_emoji: String = raw.chars().filter(|c| !is_emoji(*c)).collect();
    let single_line = no_emoji
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_start_matches(['-', '*', '•', ' '])
        .trim()
        .to_string();
    truncate_chars(&single_line, SUMMARY_MAX_CHARS)
}

fn is_emoji(c: char) -> bool {
    matches!(c,
        '\u{1F300}'..='\u{1FAFF}'
            | '\u{2600}'..='\u{27BF}'
            | '\u{2300}'..='\u{23FF}'
            | '\u{2B00}'..='\u{2BFF}'
            | '\u{FE00}'..='\u{FE0F}'
            | '\u{1F1E6}'..='\u{1F1FF}'
            | '\u{200D}')
}

/// Strip `N.` / `N)` prefixes; `None` when the count disagrees.
fn parse_numbered_lines(response: &str, expected: usize) -> Option<Vec<String>> {
    let lines: Vec<String> = response
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(|l| {
            l.trim_start_matches(|c: char| c.is_ascii_digit())
                .trim_start_matches(['.', ')'])
                .trim()
                .to_string()
        })
        .collect();

    (lines.len() == expected).then_some(lines)
}

fn host_matches(domain: &str, host: &str) -> bool {
    domain == host || domain.ends_with(&format!(".{host}"))
}

/// Category of one source for the primary-type vote.
pub fn classify_source(kind: SourceKind, url: &str, domain: &str, title: &str) -> PrimaryType {
    if matches!(kind, SourceKind::Video | SourceKind::Image) {
        return PrimaryType::Data;
    }
    if SOCIAL_HOSTS.iter().any(|h| host_matches(domain, h)) {
        return PrimaryType::Social;
    }
    let lowered_url = url.to_lowercase();
    let lowered_title = title.to_lowercase();
    if DATA_HOSTS.iter().any(|h| host_matches(domain, h))
        || host_matches(domain, "youtube.com")
        || host_matches(domain, "youtu.be")
        || lowered_url.contains("arxiv")
        || lowered_title.contains("paper")
        || lowered_title.contains("논문")
    {
        return PrimaryType::Data;
    }
    PrimaryType::News
}

/// Position-weighted vote: 1-3 weigh 3, 4-8 weigh 2, the rest 1. Ties go to
/// the first source's category, then news, social, data.
pub fn primary_type_of(flat: &[(SourceKind, SearchHit)]) -> PrimaryType {
    let categorized: Vec<PrimaryType> = flat
        .iter()
        .map(|(kind, hit)| {
            classify_source(
                *kind,
                &hit.url,
                &host_of(&hit.url).unwrap_or_default(),
                &hit.title,
            )
        })
        .collect();

    vote(&categorized)
}

/// Same vote over already-persisted rows, used by the reuse path.
pub fn primary_type_of_records(sources: &[SourceRecord]) -> PrimaryType {
    let categorized: Vec<PrimaryType> = sources
        .iter()
        .map(|s| classify_source(s.kind, &s.url, &s.domain, &s.title))
        .collect();

    vote(&categorized)
}

fn vote(categorized: &[PrimaryType]) -> PrimaryType {
    let Some(first) = categorized.first().copied() else {
        return PrimaryType::News;
    };

    let mut tally: HashMap<PrimaryType, u32> = HashMap::new();
    for (position, category) in categorized.iter().enumerate() {
        let weight = match position {
            0..=2 => 3,
            3..=7 => 2,
            _ => 1,
        };
        *tally.entry(*category).or_insert(0) += weight;
    }

    let best = tally.values().copied().max().unwrap_or(0);
    let mut contenders = [first, PrimaryType::News, PrimaryType::Social, PrimaryType::Data]
        .into_iter();
    contenders
        .find(|c| tally.get(c).copied().unwrap_or(0) == best)
        .unwrap_or(PrimaryType::News)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(title: &str, url: &str) -> SearchHit {
        SearchHit {
            title: title.to_string(),
            url: url.to_string(),
            snippet: None,
            image_url: None,
            published_at: None,
        }
    }

    #[test]
    fn sanitize_strips_emoji_and_newlines() {
        let raw = "🤖 GPT-5가 출시되었습니다.\n자세한 내용은 다음과 같습니다.";
        let cleaned = sanitize_summary(raw);
        assert!(!cleaned.contains('🤖'));
        assert!(!cleaned.contains('\n'));
        assert!(cleaned.starts_with("GPT-5가"));
    }

    #[test]
    fn sanitize_bounds_length() {
        let raw = "가".repeat(500);
        assert_eq!(sanitize_summary(&raw).chars().count(), SUMMARY_MAX_CHARS);
    }

    #[test]
    fn numbered_lines_roundtrip() {
        let lines = parse_numbered_lines("1. 첫 번째\n2) 두 번째\n", 2).unwrap();
        assert_eq!(lines, vec!["첫 번째", "두 번째"]);
        assert!(parse_numbered_lines("1. only one", 2).is_none());
    }

    #[test]
    fn classifier_rules() {
        assert_eq!(
            classify_source(SourceKind::Video, "https://youtube.com/w", "youtube.com", "demo"),
            PrimaryType::Data
        );
        assert_eq!(
            classify_source(SourceKind::Web, "https://x.com/p", "x.com", "thread"),
            PrimaryType::Social
        );
        assert_eq!(
            classify_source(
                SourceKind::Web,
                "https://arxiv.org/abs/1",
                "arxiv.org",
                "A paper"
            ),
            PrimaryType::Data
        );
        assert_eq!(
            classify_source(
                SourceKind::News,
                "https://techcrunch.com/a",
                "techcrunch.com",
                "Launch coverage"
            ),
            PrimaryType::News
        );
    }

    #[test]
    fn vote_weights_leading_positions() {
        // Three news up front (weight 3 each) outvote two social after them
        // (weight 2 each).
        let news_heavy: Vec<(SourceKind, SearchHit)> = (0..3)
            .map(|i| {
                (
                    SourceKind::News,
                    hit("story", &format!("https://news{i}.example.com/a")),
                )
            })
            .chain((0..2).map(|i| {
                (
                    SourceKind::Web,
                    hit("post", &format!("https://x.com/p{i}")),
                )
            }))
            .collect();
        assert_eq!(primary_type_of(&news_heavy), PrimaryType::News);

        // Five mid-list social (5 x 2) outvote the three leading news (3 x 3).
        let social_heavy: Vec<(SourceKind, SearchHit)> = (0..3)
            .map(|i| {
                (
                    SourceKind::News,
                    hit("story", &format!("https://news{i}.example.com/a")),
                )
            })
            .chain((0..5).map(|i| {
                (
                    SourceKind::Web,
                    hit("post", &format!("https://x.com/p{i}")),
                )
            }))
            .collect();
        assert_eq!(primary_type_of(&social_heavy), PrimaryType::Social);
    }

    #[test]
    fn empty_sources_default_to_news() {
        assert_eq!(primary_type_of(&[]), PrimaryType::News);
    }

    #[test]
    fn fallback_templates_name_the_keyword() {
        assert!(fallback_summary("GPT-5", 4, true).contains("GPT-5"));
        assert!(fallback_summary("GPT-5", 4, false).contains("4 recent sources"));
    }
}
