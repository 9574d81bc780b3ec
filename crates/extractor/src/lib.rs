pub mod filters;
pub mod slug;

pub use filters::{drop_reason, DropReason};
pub use slug::slugify;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use common::{Item, KeywordCandidate, NormalizedKeyword};
use openai_chat::ChatApi;

const BATCH_SIZE: usize = 200;
const EXTRACTION_TEMPERATURE: f32 = 0.0;

const SYSTEM_PROMPT: &str = "\
You extract trending AI topic keywords from news titles.\n\
Rules:\n\
- Each keyword is 1-3 words (absolute maximum 4).\n\
- Keep product and version names verbatim (e.g. GPT-4o, Claude Code, Llama 4).\n\
- Never return article headlines or full sentences.\n\
- Never return generic AI phrases (AI agent, AI-powered platform, 인공지능 기술).\n\
- Target 20-35 keywords per request.\n\
Respond with ONLY a JSON array: [{\"keyword\": \"...\", \"aliases\": [\"...\"]}].\n\
No markdown, no commentary.";

/// Trailing Korean action words stripped before canonical comparison.
const ACTION_SUFFIXES: [&str; 14] = [
    "도입", "채택", "활용", "공개", "출시", "발표", "확대", "추진", "적용", "업데이트", "통합",
    "지원", "강화", "개선",
];

/// The only response shape accepted from the extraction model.
#[derive(Debug, Deserialize)]
pub struct ExtractedKeyword {
    pub keyword: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// LLM-driven keyword extraction with a deterministic safety net.
pub struct KeywordExtractor {
    chat: Arc<dyn ChatApi>,
}

impl KeywordExtractor {
    pub fn new(chat: Arc<dyn ChatApi>) -> Self {
        Self { chat }
    }

    pub async fn extract(&self, items: &[Item]) -> Vec<NormalizedKeyword> {
        let batches = prepare_batches(items);
        let mut merged = MergedKeywords::default();

        for (index, batch) in batches.iter().enumerate() {
            let user = batch
                .iter()
                .map(|t| format!("- {t}"))
                .collect::<Vec<_>>()
                .join("\n");

            match self.chat.chat(SYSTEM_PROMPT, &user, EXTRACTION_TEMPERATURE).await {
                Ok(response) => match parse_keyword_array(&response) {
                    Some(keywords) if !keywords.is_empty() => {
                        for kw in keywords {
                            merged.add(kw.keyword, kw.aliases);
                        }
                    }
                    _ => warn!("batch {} returned no parseable keywords", index),
                },
                Err(e) => warn!("batch {} extraction failed: {}", index, e),
            }
        }

        if merged.is_empty() {
            info!("LLM extraction empty; falling back to token scan");
            for token in fallback_keywords(items) {
                merged.add(token, Vec::new());
            }
        }

        normalize(merged.into_entries())
    }
}

/// Case-insensitive accumulation across batches, preserving first-seen order
/// (batches lead with the highest-authority titles).
#[derive(Default)]
struct MergedKeywords {
    order: Vec<String>,
    by_canonical: HashMap<String, (String, Vec<String>)>,
}

impl MergedKeywords {
    fn add(&mut self, keyword: String, aliases: Vec<String>) {
        let display = keyword.trim().to_string();
        if display.is_empty() {
            return;
        }
        let canonical = canonical_of(&display);
        match self.by_canonical.get_mut(&canonical) {
            Some((_, existing)) => {
                for alias in aliases {
                    push_unique(existing, alias);
                }
            }
            None => {
                self.order.push(canonical.clone());
                self.by_canonical.insert(canonical, (display, aliases));
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn into_entries(mut self) -> Vec<(String, Vec<String>)> {
        self.order
            .iter()
            .filter_map(|canonical| self.by_canonical.remove(canonical))
            .collect()
    }
}

/// Dedup titles case-insensitively, order by tier authority, chunk.
pub fn prepare_batches(items: &[Item]) -> Vec<Vec<String>> {
    let mut seen = std::collections::HashSet::new();
    let mut titled: Vec<(u8, String)> = Vec::new();

    for item in items {
        let title = item.title.trim();
        if title.is_empty() {
            continue;
        }
        if seen.insert(title.to_lowercase()) {
            titled.push((item.tier.ordinal(), title.to_string()));
        }
    }

    titled.sort_by_key(|(ordinal, _)| *ordinal);

    titled
        .chunks(BATCH_SIZE)
        .map(|chunk| chunk.iter().map(|(_, t)| t.clone()).collect())
        .collect()
}

/// Pull the first JSON array out of a possibly markdown-wrapped response.
pub fn parse_keyword_array(response: &str) -> Option<Vec<ExtractedKeyword>> {
    let start = response.find('[')?;
    let end = response.rfind(']')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&response[start..=end]).ok()
}

static CAMEL_CASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][a-z0-9]+(?:[A-Z][a-z0-9]+)+\b").expect("static regex"));
static VERSIONED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Za-z]{2,}-?\d+(?:\.\d+)?[A-Za-z0-9]*\b").expect("static regex"));

/// Rule-based safety net: CamelCase and version-numbered identifiers.
pub fn fallback_keywords(items: &[Item]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut keywords = Vec::new();

    for item in items {
        for regex in [&*CAMEL_CASE, &*VERSIONED] {
            for matched in regex.find_iter(&item.title) {
                let token = matched.as_str();
                if token.chars().count() < 4 {
                    continue;
                }
                if seen.insert(token.to_lowercase()) {
                    keywords.push(token.to_string());
                }
            }
        }
    }
    keywords
}

/// Strip one trailing action word ("GPT-5 출시" -> "GPT-5").
pub fn strip_trailing_action(text: &str) -> &str {
    let Some((head, last)) = text.trim().rsplit_once(char::is_whitespace) else {
        return text;
    };
    if ACTION_SUFFIXES.contains(&last) {
        head.trim_end()
    } else {
        text
    }
}

fn canonical_of(text: &str) -> String {
    text.trim().to_lowercase()
}

fn push_unique(list: &mut Vec<String>, value: String) {
    let value = value.trim().to_string();
    if value.is_empty() {
        return;
    }
    if !list.iter().any(|v| v.eq_ignore_ascii_case(&value)) {
        list.push(value);
    }
}

/// Trailing-verb dedup, filter chain, and slug assignment.
fn normalize(entries: Vec<(String, Vec<String>)>) -> Vec<NormalizedKeyword> {
    // Re-merge after stripping trailing action words.
    let mut merged = MergedKeywords::default();
    for (display, aliases) in entries {
        let stripped = strip_trailing_action(&display).to_string();
        let mut aliases = aliases;
        if stripped != display {
            push_unique(&mut aliases, display.clone());
        }
        merged.add(stripped, aliases);
    }

    let mut by_id: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<NormalizedKeyword> = Vec::new();

    for (kw, aliases) in merged.into_entries() {
        let canonical = canonical_of(&kw);
        if let Some(reason) = drop_reason(&canonical) {
            debug!(keyword = %kw, ?reason, "dropped by filter");
            continue;
        }

        let keyword_id = slugify(&canonical);
        match by_id.get(&keyword_id) {
            Some(&idx) => {
                // Same slug, different surface: fold into the earlier entry.
                let entry = &mut out[idx];
                push_unique(&mut entry.aliases, kw);
                for alias in aliases {
                    push_unique(&mut entry.aliases, alias);
                }
            }
            None => {
                by_id.insert(keyword_id.clone(), out.len());
                let candidate = KeywordCandidate::new(kw.clone());
                out.push(NormalizedKeyword {
                    keyword_id,
                    keyword: kw,
                    aliases,
                    candidate,
                });
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common::{Lang, Tier};
    use time::OffsetDateTime;

    struct FakeChat {
        response: String,
    }

    #[async_trait]
    impl ChatApi for FakeChat {
        async fn chat(&self, _s: &str, _u: &str, _t: f32) -> anyhow::Result<String> {
            Ok(self.response.clone())
        }
    }

    struct FailingChat;

    #[async_trait]
    impl ChatApi for FailingChat {
        async fn chat(&self, _s: &str, _u: &str, _t: f32) -> anyhow::Result<String> {
            anyhow::bail!("model unavailable")
        }
    }

    fn item(title: &str, tier: Tier) -> Item {
        Item {
            title: title.to_string(),
            link: format!("https://example.com/{}", title.len()),
            published_at: OffsetDateTime::UNIX_EPOCH,
            summary: String::new(),
            source_domain: "example.com".to_string(),
            feed_title: "Example".to_string(),
            tier,
            lang: Lang::En,
        }
    }

    #[test]
    fn batches_dedup_and_lead_with_authority() {
        let items = vec![
            item("community post", Tier::Community),
            item("Curated headline", Tier::P0Curated),
            item("CURATED HEADLINE", Tier::Community),
        ];
        let batches = prepare_batches(&items);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0], vec!["Curated headline", "community post"]);
    }

    #[test]
    fn parses_markdown_wrapped_array() {
        let response = "Here you go:\n```json\n[{\"keyword\": \"GPT-4o\", \"aliases\": [\"gpt4o\"]}]\n```";
        let parsed = parse_keyword_array(response).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].keyword, "GPT-4o");
        assert_eq!(parsed[0].aliases, vec!["gpt4o"]);
    }

    #[test]
    fn rejects_non_array_responses() {
        assert!(parse_keyword_array("no json here").is_none());
        assert!(parse_keyword_array("{\"keyword\": \"x\"}").is_none());
    }

    #[test]
    fn trailing_action_strip() {
        assert_eq!(strip_trailing_action("GPT-5 출시"), "GPT-5");
        assert_eq!(strip_trailing_action("Claude Code 업데이트"), "Claude Code");
        assert_eq!(strip_trailing_action("Claude Code"), "Claude Code");
        assert_eq!(strip_trailing_action("출시"), "출시");
    }

    #[test]
    fn fallback_finds_camelcase_and_versions() {
        let items = vec![
            item("DeepSeek releases new weights", Tier::Community),
            item("Benchmarking GPT-4.1 against Llama4", Tier::Community),
        ];
        let found = fallback_keywords(&items);
        assert!(found.contains(&"DeepSeek".to_string()));
        assert!(found.contains(&"GPT-4.1".to_string()));
        assert!(found.contains(&"Llama4".to_string()));
    }

    #[tokio::test]
    async fn extraction_merges_and_filters() {
        let response = r#"[
            {"keyword": "Claude Code", "aliases": ["클로드 코드"]},
            {"keyword": "claude code", "aliases": ["CC"]},
            {"keyword": "Claude Code 출시", "aliases": []},
            {"keyword": "AI Agent System", "aliases": []},
            {"keyword": "GPT-4o", "aliases": []}
        ]"#;
        let extractor = KeywordExtractor::new(Arc::new(FakeChat {
            response: response.to_string(),
        }));
        let keywords = extractor.extract(&[item("whatever", Tier::P0Curated)]).await;

        let ids: Vec<&str> = keywords.iter().map(|k| k.keyword_id.as_str()).collect();
        assert_eq!(ids, vec!["claude_code", "gpt_4o"]);

        let claude = &keywords[0];
        assert_eq!(claude.keyword, "Claude Code");
        assert!(claude.aliases.iter().any(|a| a == "클로드 코드"));
        assert!(claude.aliases.iter().any(|a| a == "CC"));
        assert!(claude.aliases.iter().any(|a| a == "Claude Code 출시"));
    }

    #[tokio::test]
    async fn llm_failure_falls_back_to_token_scan() {
        let extractor = KeywordExtractor::new(Arc::new(FailingChat));
        let keywords = extractor
            .extract(&[item("OpenCode adds GPT-4.1 support", Tier::Community)])
            .await;
        let ids: Vec<&str> = keywords.iter().map(|k| k.keyword_id.as_str()).collect();
        assert!(ids.contains(&"opencode"));
        assert!(ids.contains(&"gpt_4_1"));
    }
}
