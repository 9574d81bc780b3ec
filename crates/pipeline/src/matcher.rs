use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use common::{contains_hangul, Item, NormalizedKeyword};

/// Tokens too common to anchor a phrase match: English connectives plus
/// standalone Korean particles. Kept separate from the extractor's particle
/// set on purpose; the two lists serve different judgements.
static SHORT_STOPWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "the", "and", "for", "with", "from", "into", "over", "new", "his", "her",
        "및", "와", "과", "의", "을", "를", "은", "는", "이", "가", "에", "에서", "으로", "로",
    ])
});

/// Scan all items once per keyword, accumulating support metadata. Keywords
/// with no supporting item are dropped.
pub fn match_keywords(
    keywords: Vec<NormalizedKeyword>,
    items: &[Item],
) -> Vec<NormalizedKeyword> {
    let haystacks: Vec<String> = items
        .iter()
        .map(|item| format!("{} {}", item.title, item.summary).to_lowercase())
        .collect();

    let mut matched = Vec::new();
    for mut keyword in keywords {
        let variants = variants_of(&keyword);
        for (item, haystack) in items.iter().zip(&haystacks) {
            if variants.iter().any(|v| variant_matches(v, haystack)) {
                keyword.candidate.absorb(item);
            }
        }
        if keyword.candidate.count > 0 {
            matched.push(keyword);
        }
    }
    matched
}

fn variants_of(keyword: &NormalizedKeyword) -> Vec<String> {
    let mut variants: Vec<String> = Vec::new();
    let mut push = |text: &str| {
        let v = text.trim().to_lowercase();
        if !v.is_empty() && !variants.contains(&v) {
            variants.push(v);
        }
    };

    push(&keyword.keyword);
    for alias in &keyword.aliases {
        push(alias);
    }
    if let Some(ascii) = ascii_variant(&keyword.keyword) {
        push(&ascii);
    }
    variants
}

/// ASCII remnant of a mixed-script keyword: Hangul runs removed, separators
/// normalized, so a partially-transliterated form still matches an English
/// title.
pub fn ascii_variant(text: &str) -> Option<String> {
    if !contains_hangul(text) {
        return None;
    }
    let stripped: String = text
        .chars()
        .map(|c| {
            if matches!(c, '\u{AC00}'..='\u{D7A3}' | '\u{1100}'..='\u{11FF}' | '\u{3130}'..='\u{318F}')
            {
                ' '
            } else {
                c
            }
        })
        .collect();

    let normalized = stripped
        .split(|c: char| c.is_whitespace() || c == '-' || c == '·' || c == '/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    (normalized.chars().count() >= 3).then_some(normalized)
}

/// Match one lowercase variant against a lowercase haystack.
///
/// - short single token: whole-word match;
/// - longer single token: substring match;
/// - phrase: every significant token must occur somewhere (order-free).
pub fn variant_matches(variant: &str, haystack: &str) -> bool {
    if !variant.contains(char::is_whitespace) {
        if variant.chars().count() <= 2 {
            return whole_word_matches(variant, haystack);
        }
        return haystack.contains(variant);
    }

    let significant: Vec<&str> = variant
        .split_whitespace()
        .filter(|token| token.chars().count() >= 3 && !SHORT_STOPWORDS.contains(token))
        .collect();

    if significant.is_empty() {
        return haystack.contains(variant);
    }
    significant.iter().all(|token| haystack.contains(token))
}

fn whole_word_matches(token: &str, haystack: &str) -> bool {
    match Regex::new(&format!(r"\b{}\b", regex::escape(token))) {
        Ok(re) => re.is_match(haystack),
        Err(_) => haystack.contains(token),
    }
}
