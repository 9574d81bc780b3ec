use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Exact canonical strings that are never trend keywords on their own.
static GENERIC_TERMS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "ai",
        "인공지능",
        "생성형 ai",
        "생성형ai",
        "genai",
        "generative ai",
        "llm",
        "모델",
        "model",
        "agent",
        "agents",
        "에이전트",
        "ai 에이전트",
        "챗봇",
        "chatbot",
        "기술",
        "서비스",
        "플랫폼",
        "솔루션",
        "시스템",
        "데이터",
        "자동화",
        "알고리즘",
        "machine learning",
        "머신러닝",
        "딥러닝",
        "deep learning",
    ])
});

/// Agent words are generic for prefix-phrase judgement but deliberately kept
/// out of [`GENERIC_WORDS`] so `AI agent ...` phrases are attributed to the
/// agent filter rather than the all-generic one.
static AGENT_WORDS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| HashSet::from(["agent", "agents", "에이전트"]));

/// Words considered generic when judging whole phrases.
static GENERIC_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "ai",
        "인공지능",
        "생성형",
        "generative",
        "지능형",
        "모델",
        "model",
        "models",
        "시스템",
        "system",
        "systems",
        "플랫폼",
        "platform",
        "서비스",
        "service",
        "services",
        "기반",
        "기술",
        "technology",
        "tech",
        "솔루션",
        "solution",
        "데이터",
        "data",
        "자동화",
        "automation",
        "프로젝트",
        "project",
        "설계",
        "design",
        "개발",
        "development",
        "도구",
        "tool",
        "tools",
        "활용",
        "학습",
        "learning",
        "투자",
        "전략",
        "strategy",
        "시장",
        "market",
        "산업",
        "industry",
        "기업",
        "enterprise",
        "비즈니스",
        "business",
        "혁신",
        "innovation",
        "디지털",
        "digital",
        "스마트",
        "smart",
        "assistant",
        "어시스턴트",
        "챗봇",
        "chatbot",
    ])
});

/// Standalone Korean particles and connectives ignored when counting
/// significant words.
static PARTICLES: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "의", "을", "를", "이", "가", "은", "는", "에", "에서", "으로", "로", "와", "과", "및",
        "도", "속", "위한", "통한", "대한",
    ])
});

/// Topics this surface does not track, even when they co-occur with AI terms.
static BLOCKED_TOPICS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    vec![
        "부동산", "아파트", "청약", "코스피", "코스닥", "환율", "유가", "금리", "날씨", "미세먼지",
        "선거", "국회", "야구", "축구", "올림픽", "로또",
    ]
});

static AI_AGENT_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ai[ -](agents?|에이전트)\b").expect("static regex"));

static AI_GENERIC_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ai[ -](기반|모델|투자|학습용|활용|powered|based|driven|enabled)\b")
        .expect("static regex")
});

static HEADLINE_ENDING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(한다|했다|된다|됐다|있다|없다|이다|하다|나선다|나섰다|밝혔다|말했다)$")
        .expect("static regex")
});

static COUNTER_EXPRESSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\s*(종|개|건|곳|명)(\s|$)").expect("static regex"));

static TRANSLITERATION_REMNANT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[가-힣]+-[A-Za-z0-9]+|[A-Za-z0-9]+-[가-힣]+").expect("static regex")
});

/// Why a keyword was dropped. Order mirrors evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    GenericTerm,
    AllGenericPhrase,
    GenericAiAgentPhrase,
    GenericAiPrefixPhrase,
    TooManyWords,
    HeadlineLike,
    BlockedTopic,
    TransliterationRemnant,
}

/// Evaluate the hard-drop filter chain against a canonical (lowercased,
/// trimmed) keyword. Returns the first matching reason.
pub fn drop_reason(canonical: &str) -> Option<DropReason> {
    if is_generic_term(canonical) {
        return Some(DropReason::GenericTerm);
    }
    if is_all_generic_phrase(canonical) {
        return Some(DropReason::AllGenericPhrase);
    }
    if is_generic_ai_agent_phrase(canonical) {
        return Some(DropReason::GenericAiAgentPhrase);
    }
    if is_generic_ai_prefix_phrase(canonical) {
        return Some(DropReason::GenericAiPrefixPhrase);
    }
    if significant_word_count(canonical) > 4 {
        return Some(DropReason::TooManyWords);
    }
    if is_headline_like(canonical) {
        return Some(DropReason::HeadlineLike);
    }
    if is_blocked_topic(canonical) {
        return Some(DropReason::BlockedTopic);
    }
    if TRANSLITERATION_REMNANT.is_match(canonical) {
        return Some(DropReason::TransliterationRemnant);
    }
    None
}

pub fn is_generic_term(canonical: &str) -> bool {
    GENERIC_TERMS.contains(canonical)
}

/// Multi-word phrase whose every word of length >= 3 is generic.
pub fn is_all_generic_phrase(canonical: &str) -> bool {
    let words: Vec<&str> = canonical.split_whitespace().collect();
    if words.len() < 2 {
        return false;
    }
    let significant: Vec<&str> = words
        .iter()
        .copied()
        .filter(|w| w.chars().count() >= 3 || GENERIC_WORDS.contains(w))
        .collect();
    !significant.is_empty() && significant.iter().all(|w| GENERIC_WORDS.contains(w))
}

/// `AI agent(s)` / `AI 에이전트` followed only by generic words.
pub fn is_generic_ai_agent_phrase(canonical: &str) -> bool {
    let Some(matched) = AI_AGENT_PREFIX.find(canonical) else {
        return false;
    };
    rest_is_generic(&canonical[matched.end()..])
}

/// `AI 기반` and friends followed only by generic words.
pub fn is_generic_ai_prefix_phrase(canonical: &str) -> bool {
    let Some(matched) = AI_GENERIC_PREFIX.find(canonical) else {
        return false;
    };
    rest_is_generic(&canonical[matched.end()..])
}

fn rest_is_generic(rest: &str) -> bool {
    rest.split_whitespace()
        .all(|w| GENERIC_WORDS.contains(w) || AGENT_WORDS.contains(w))
}

/// Word count after discarding standalone particles.
pub fn significant_word_count(canonical: &str) -> usize {
    canonical
        .split_whitespace()
        .filter(|w| !PARTICLES.contains(w))
        .count()
}

/// Korean article-headline shapes: sentence-final verb endings, quoted
/// speech, counter expressions.
pub fn is_headline_like(canonical: &str) -> bool {
    if canonical
        .chars()
        .any(|c| matches!(c, '"' | '\u{201C}' | '\u{201D}' | '\u{2018}' | '\u{2019}' | '「' | '」'))
    {
        return true;
    }
    if COUNTER_EXPRESSION.is_match(canonical) {
        return true;
    }
    // Verb endings only fire on multi-word Korean phrases; a product name
    // that happens to end in a matching syllable is left alone.
    canonical.contains(' ')
        && common::contains_hangul(canonical)
        && HEADLINE_ENDING.is_match(canonical)
}

pub fn is_blocked_topic(canonical: &str) -> bool {
    BLOCKED_TOPICS.iter().any(|topic| canonical.contains(topic))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_generic_terms_drop() {
        assert_eq!(drop_reason("ai"), Some(DropReason::GenericTerm));
        assert_eq!(drop_reason("에이전트"), Some(DropReason::GenericTerm));
        assert_eq!(drop_reason("gpt-4o"), None);
    }

    #[test]
    fn all_generic_phrase_drops() {
        assert_eq!(
            drop_reason("ai 플랫폼 서비스"),
            Some(DropReason::AllGenericPhrase)
        );
        // A concrete product name keeps the phrase alive.
        assert_eq!(drop_reason("claude 플랫폼"), None);
    }

    #[test]
    fn generic_ai_agent_phrase_drops() {
        assert_eq!(
            drop_reason("ai agent system"),
            Some(DropReason::GenericAiAgentPhrase)
        );
        assert_eq!(
            drop_reason("ai 에이전트 플랫폼"),
            Some(DropReason::GenericAiAgentPhrase)
        );
        assert_eq!(drop_reason("ai agent claude"), None);
    }

    #[test]
    fn generic_ai_prefix_phrase_drops() {
        assert_eq!(
            drop_reason("ai 기반 프로젝트 설계 에이전트"),
            Some(DropReason::GenericAiPrefixPhrase)
        );
        assert_eq!(
            drop_reason("ai-powered automation platform"),
            Some(DropReason::GenericAiPrefixPhrase)
        );
    }

    #[test]
    fn long_phrases_drop() {
        assert_eq!(
            drop_reason("claude 모델 출시 일정 공유 행사"),
            Some(DropReason::TooManyWords)
        );
        // Particles do not count.
        assert_eq!(significant_word_count("정부 의 ai 전략"), 3);
    }

    #[test]
    fn headline_shapes_drop() {
        assert_eq!(
            drop_reason("삼성전자 신제품 3종 공개한다"),
            Some(DropReason::HeadlineLike)
        );
        assert_eq!(
            drop_reason("\"quoted claim\" startup"),
            Some(DropReason::HeadlineLike)
        );
        assert_eq!(drop_reason("진화한다"), None); // single word, not a headline
    }

    #[test]
    fn blocked_topics_drop() {
        assert_eq!(
            drop_reason("부동산 시세 예측"),
            Some(DropReason::BlockedTopic)
        );
    }

    #[test]
    fn transliteration_remnants_drop() {
        assert_eq!(
            drop_reason("오픈-ai"),
            Some(DropReason::TransliterationRemnant)
        );
        assert_eq!(drop_reason("온디바이스 ai"), None);
    }
}
