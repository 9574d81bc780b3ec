use std::cmp::Ordering;
use std::collections::HashMap;

use time::OffsetDateTime;

use common::{KeywordCandidate, NormalizedKeyword};

/// Exponential recency half-life control, in hours.
const RECENCY_DECAY_HOURS: f64 = 36.0;
/// Domains needed for a full frequency score.
const FREQUENCY_SATURATION: f64 = 10.0;

const WEIGHT_RECENCY: f64 = 0.45;
const WEIGHT_FREQUENCY: f64 = 0.20;
const WEIGHT_AUTHORITY: f64 = 0.20;
const WEIGHT_INTERNAL: f64 = 0.15;

/// Bonus granted to keywords absent from every prior snapshot.
const NOVELTY_BONUS: f64 = 0.15;

#[derive(Debug, Clone, Copy)]
pub struct Scores {
    pub recency: f64,
    pub frequency: f64,
    pub authority: f64,
    pub internal: f64,
    pub total: f64,
}

/// A ranked keyword ready for persistence.
#[derive(Debug, Clone)]
pub struct RankedKeyword {
    pub keyword: NormalizedKeyword,
    pub scores: Scores,
    pub rank: i32,
    pub delta_rank: i32,
    pub is_new: bool,
}

/// Score one candidate. `internal` is the operator channel and stays 0 until
/// a boost/blacklist table feeds it.
pub fn score_candidate(candidate: &KeywordCandidate, now: OffsetDateTime) -> Scores {
    let age_hours = ((now - candidate.latest_at).as_seconds_f64() / 3600.0).max(0.0);
    let recency = (-age_hours / RECENCY_DECAY_HOURS).exp();
    let frequency = (candidate.domains.len() as f64 / FREQUENCY_SATURATION).min(1.0);
    let authority = candidate.tier.authority();
    let internal = 0.0;

    let total = WEIGHT_RECENCY * recency
        + WEIGHT_FREQUENCY * frequency
        + WEIGHT_AUTHORITY * authority
        + WEIGHT_INTERNAL * internal;

    Scores {
        recency,
        frequency,
        authority,
        internal,
        total,
    }
}

/// Four-decimal rounding applied at the persistence boundary.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Rank the scored keywords: top `top_r` by raw total, delta against the
/// previous ranks, novelty bonus, then a stable re-sort and dense 1..n
/// renumbering.
pub fn rank_keywords(
    scored: Vec<(NormalizedKeyword, Scores)>,
    previous_ranks: &HashMap<String, i32>,
    top_r: usize,
) -> Vec<RankedKeyword> {
    let mut ordered = scored;
    ordered.sort_by(|a, b| compare_totals(b.1.total, a.1.total));
    ordered.truncate(top_r);

    let mut ranked: Vec<RankedKeyword> = ordered
        .into_iter()
        .map(|(keyword, mut scores)| {
            let prev = previous_ranks.get(&keyword.keyword_id).copied();
            let is_new = prev.is_none();
            if is_new {
                scores.total += NOVELTY_BONUS;
            }
            RankedKeyword {
                keyword,
                scores,
                rank: 0,
                delta_rank: 0,
                is_new,
            }
        })
        .collect();

    ranked.sort_by(|a, b| compare_totals(b.scores.total, a.scores.total));

    for (index, entry) in ranked.iter_mut().enumerate() {
        entry.rank = (index + 1) as i32;
        entry.delta_rank = match previous_ranks.get(&entry.keyword.keyword_id) {
            Some(prev) => prev - entry.rank,
            None => 0,
        };
    }
    ranked
}

fn compare_totals(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Tier;
    use time::Duration;

    fn candidate(domains: usize, age_hours: i64, tier: Tier, now: OffsetDateTime) -> KeywordCandidate {
        let mut cand = KeywordCandidate::new("kw");
        cand.count = domains as u32;
        for i in 0..domains {
            cand.domains.insert(format!("d{i}.example.com"));
        }
        cand.latest_at = now - Duration::hours(age_hours);
        cand.tier = tier;
        cand
    }

    fn keyword(id: &str, total: f64) -> (NormalizedKeyword, Scores) {
        (
            NormalizedKeyword {
                keyword_id: id.to_string(),
                keyword: id.to_string(),
                aliases: Vec::new(),
                candidate: KeywordCandidate::new(id),
            },
            Scores {
                recency: 0.0,
                frequency: 0.0,
                authority: 0.0,
                internal: 0.0,
                total,
            },
        )
    }

    #[test]
    fn recency_decays_with_age() {
        let now = OffsetDateTime::UNIX_EPOCH + Duration::days(400 * 365);
        let fresh = score_candidate(&candidate(1, 0, Tier::P2Raw, now), now);
        let day_old = score_candidate(&candidate(1, 24, Tier::P2Raw, now), now);
        let stale = score_candidate(&candidate(1, 72, Tier::P2Raw, now), now);
        assert!(fresh.recency > day_old.recency && day_old.recency > stale.recency);
        assert!((fresh.recency - 1.0).abs() < 1e-9);
    }

    #[test]
    fn frequency_saturates_at_ten_domains() {
        let now = OffsetDateTime::UNIX_EPOCH;
        let few = score_candidate(&candidate(3, 0, Tier::P2Raw, now), now);
        let many = score_candidate(&candidate(10, 0, Tier::P2Raw, now), now);
        let excess = score_candidate(&candidate(15, 0, Tier::P2Raw, now), now);
        assert!(few.frequency < many.frequency);
        assert_eq!(many.frequency, 1.0);
        assert_eq!(excess.frequency, 1.0);
    }

    #[test]
    fn better_tier_never_lowers_authority() {
        let now = OffsetDateTime::UNIX_EPOCH;
        let curated = score_candidate(&candidate(1, 0, Tier::P0Curated, now), now);
        let community = score_candidate(&candidate(1, 0, Tier::Community, now), now);
        assert!(curated.authority >= community.authority);
    }

    #[test]
    fn rounding_is_four_decimals() {
        assert_eq!(round4(0.123456), 0.1235);
        assert_eq!(round4(0.1), 0.1);
    }

    #[test]
    fn novelty_bonus_reorders_and_renumbers() {
        let mut previous = HashMap::new();
        previous.insert("a".to_string(), 1);
        previous.insert("b".to_string(), 2);

        let ranked = rank_keywords(
            vec![keyword("a", 0.70), keyword("b", 0.68), keyword("c", 0.60)],
            &previous,
            20,
        );

        let order: Vec<(&str, i32, i32, bool)> = ranked
            .iter()
            .map(|r| (r.keyword.keyword_id.as_str(), r.rank, r.delta_rank, r.is_new))
            .collect();
        assert_eq!(
            order,
            vec![("c", 1, 0, true), ("a", 2, -1, false), ("b", 3, -1, false)]
        );
    }

    #[test]
    fn ranks_are_dense_and_bounded() {
        let scored: Vec<_> = (0..30)
            .map(|i| keyword(&format!("k{i}"), 1.0 - i as f64 / 100.0))
            .collect();
        let ranked = rank_keywords(scored, &HashMap::new(), 20);
        assert_eq!(ranked.len(), 20);
        let ranks: Vec<i32> = ranked.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, (1..=20).collect::<Vec<i32>>());
    }
}
