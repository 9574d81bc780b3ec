use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Maximum summary length carried per item (characters).
pub const MAX_ITEM_SUMMARY_LEN: usize = 500;

/// Authority class assigned by the adapter that produced an item.
///
/// The ordinal doubles as the dedup priority: when two sources emit the
/// same URL, the lower ordinal wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    P0Curated,
    P0Releases,
    P1Context,
    P2Raw,
    Community,
}

impl Tier {
    pub fn ordinal(self) -> u8 {
        match self {
            Tier::P0Curated => 0,
            Tier::P0Releases => 1,
            Tier::P1Context => 2,
            Tier::P2Raw => 3,
            Tier::Community => 4,
        }
    }

    /// Authority score component in [0, 1].
    pub fn authority(self) -> f64 {
        match self {
            Tier::P0Curated | Tier::P0Releases => 1.0,
            Tier::P1Context => 0.6,
            Tier::P2Raw => 0.3,
            Tier::Community => 0.2,
        }
    }

    /// The better (lower-ordinal) of two tiers.
    pub fn best(self, other: Tier) -> Tier {
        if other.ordinal() < self.ordinal() {
            other
        } else {
            self
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::P0Curated => "P0_CURATED",
            Tier::P0Releases => "P0_RELEASES",
            Tier::P1Context => "P1_CONTEXT",
            Tier::P2Raw => "P2_RAW",
            Tier::Community => "COMMUNITY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lang {
    Ko,
    En,
}

impl Lang {
    pub fn as_str(self) -> &'static str {
        match self {
            Lang::Ko => "ko",
            Lang::En => "en",
        }
    }
}

/// One collected upstream entry, already normalized by its adapter.
#[derive(Debug, Clone)]
pub struct Item {
    pub title: String,
    pub link: String,
    pub published_at: OffsetDateTime,
    pub summary: String,
    pub source_domain: String,
    pub feed_title: String,
    pub tier: Tier,
    pub lang: Lang,
}

/// Support metadata accumulated for one extracted keyword.
#[derive(Debug, Clone)]
pub struct KeywordCandidate {
    pub text: String,
    pub count: u32,
    pub domains: BTreeSet<String>,
    pub latest_at: OffsetDateTime,
    pub tier: Tier,
}

impl KeywordCandidate {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            count: 0,
            domains: BTreeSet::new(),
            latest_at: OffsetDateTime::UNIX_EPOCH,
            tier: Tier::Community,
        }
    }

    /// Fold one supporting item into the candidate.
    pub fn absorb(&mut self, item: &Item) {
        self.count += 1;
        self.domains.insert(item.source_domain.clone());
        if item.published_at > self.latest_at {
            self.latest_at = item.published_at;
        }
        self.tier = self.tier.best(item.tier);
    }
}

/// An extracted keyword after normalization and filtering.
#[derive(Debug, Clone)]
pub struct NormalizedKeyword {
    pub keyword_id: String,
    pub keyword: String,
    pub aliases: Vec<String>,
    pub candidate: KeywordCandidate,
}

/// Source group type, as persisted in the `sources.type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    News,
    Web,
    Video,
    Image,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::News,
        SourceKind::Web,
        SourceKind::Video,
        SourceKind::Image,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::News => "news",
            SourceKind::Web => "web",
            SourceKind::Video => "video",
            SourceKind::Image => "image",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "news" => Some(SourceKind::News),
            "web" => Some(SourceKind::Web),
            "video" => Some(SourceKind::Video),
            "image" => Some(SourceKind::Image),
            _ => None,
        }
    }
}

/// Dominant source category of an enriched keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimaryType {
    News,
    Social,
    Data,
}

impl PrimaryType {
    pub fn as_str(self) -> &'static str {
        match self {
            PrimaryType::News => "news",
            PrimaryType::Social => "social",
            PrimaryType::Data => "data",
        }
    }

    /// Parse a stored value, tolerating the legacy `web`/`video`/`image` forms.
    pub fn parse(s: &str) -> Self {
        match s {
            "social" => PrimaryType::Social,
            "data" | "video" | "image" => PrimaryType::Data,
            _ => PrimaryType::News,
        }
    }
}

/// True if the string contains any Hangul syllable or jamo codepoint.
pub fn contains_hangul(s: &str) -> bool {
    s.chars().any(|c| {
        matches!(c,
            '\u{AC00}'..='\u{D7A3}' | '\u{1100}'..='\u{11FF}' | '\u{3130}'..='\u{318F}')
    })
}

/// Truncate on character boundaries so multi-byte text is never split.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_ordering_matches_authority() {
        assert!(Tier::P0Curated.ordinal() < Tier::Community.ordinal());
        assert_eq!(Tier::P0Curated.authority(), 1.0);
        assert_eq!(Tier::P0Releases.authority(), 1.0);
        assert_eq!(Tier::P1Context.authority(), 0.6);
        assert_eq!(Tier::P2Raw.authority(), 0.3);
        assert_eq!(Tier::Community.authority(), 0.2);
    }

    #[test]
    fn tier_best_picks_lower_ordinal() {
        assert_eq!(Tier::Community.best(Tier::P1Context), Tier::P1Context);
        assert_eq!(Tier::P0Curated.best(Tier::P2Raw), Tier::P0Curated);
    }

    #[test]
    fn candidate_absorb_accumulates_support() {
        let mut cand = KeywordCandidate::new("Claude Code");
        let item = Item {
            title: "Claude Code ships Teams".into(),
            link: "https://example.com/a".into(),
            published_at: OffsetDateTime::UNIX_EPOCH + time::Duration::hours(1),
            summary: String::new(),
            source_domain: "example.com".into(),
            feed_title: "Example".into(),
            tier: Tier::P0Curated,
            lang: Lang::En,
        };
        cand.absorb(&item);
        assert_eq!(cand.count, 1);
        assert!(cand.domains.contains("example.com"));
        assert_eq!(cand.tier, Tier::P0Curated);
        assert_eq!(cand.latest_at, item.published_at);
    }

    #[test]
    fn hangul_detection() {
        assert!(contains_hangul("AI 에이전트"));
        assert!(!contains_hangul("Claude Code"));
    }

    #[test]
    fn primary_type_parse_tolerates_legacy() {
        assert_eq!(PrimaryType::parse("news"), PrimaryType::News);
        assert_eq!(PrimaryType::parse("web"), PrimaryType::News);
        assert_eq!(PrimaryType::parse("video"), PrimaryType::Data);
        assert_eq!(PrimaryType::parse("social"), PrimaryType::Social);
    }
}
