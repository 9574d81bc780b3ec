use std::env;

use anyhow::{Context, Result};
use tracing::warn;

/// Ranked keywords persisted per snapshot.
pub const RANKED_KEYWORDS: usize = 20;

/// Snapshots scanned when looking for a reusable keyword payload.
pub const REUSE_SNAPSHOT_WINDOW: usize = 4;

/// Default collection lookback, in hours.
pub const DEFAULT_WINDOW_HOURS: i64 = 48;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub tavily_api_key: Option<String>,
    pub github_token: Option<String>,
    pub cron_secret: Option<String>,
    /// Top-D keywords receiving full enrichment.
    pub detailed_keywords: usize,
    pub keyword_concurrency: usize,
    pub lightweight_concurrency: usize,
    /// UTC (hour, minute) slots at which the pipeline is expected to run.
    pub schedule_utc: Vec<(u8, u8)>,
    pub enable_en_summary: bool,
    pub summary_context_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL")
            .or_else(|_| env::var("POSTGRES_URL"))
            .context("DATABASE_URL or POSTGRES_URL must be set")?;

        Ok(Config {
            database_url,
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            openai_model: env::var("OPENAI_MODEL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "gpt-4o-mini".to_string()),
            tavily_api_key: env::var("TAVILY_API_KEY").ok(),
            github_token: env::var("GITHUB_TOKEN").ok(),
            cron_secret: env::var("CRON_SECRET").ok().filter(|s| !s.is_empty()),
            detailed_keywords: clamped_env("PIPELINE_DETAILED_KEYWORDS", 10, 1, RANKED_KEYWORDS),
            keyword_concurrency: clamped_env("PIPELINE_KEYWORD_CONCURRENCY", 3, 1, 10),
            lightweight_concurrency: clamped_env("PIPELINE_LIGHTWEIGHT_CONCURRENCY", 5, 1, 20),
            schedule_utc: parse_schedule(env::var("PIPELINE_SCHEDULE_UTC").ok().as_deref()),
            enable_en_summary: env::var("ENABLE_EN_SUMMARY")
                .ok()
                .map(|v| v.trim() != "false" && v.trim() != "0")
                .unwrap_or(true),
            summary_context_limit: clamped_env("SUMMARY_CONTEXT_LIMIT", 5, 1, 10),
        })
    }

    pub fn require_openai_api_key(&self) -> Result<&String> {
        self.openai_api_key
            .as_ref()
            .context("OPENAI_API_KEY must be set")
    }

    pub fn require_tavily_api_key(&self) -> Result<&String> {
        self.tavily_api_key
            .as_ref()
            .context("TAVILY_API_KEY must be set")
    }
}

fn clamped_env(name: &str, default: usize, min: usize, max: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(default)
        .clamp(min, max)
}

/// Parse `PIPELINE_SCHEDULE_UTC` ("H:MM,H:MM"). Invalid entries are skipped;
/// an empty result falls back to the default slots.
pub fn parse_schedule(raw: Option<&str>) -> Vec<(u8, u8)> {
    const DEFAULT_SLOTS: [(u8, u8); 2] = [(0, 17), (9, 17)];

    let Some(raw) = raw else {
        return DEFAULT_SLOTS.to_vec();
    };

    let mut slots: Vec<(u8, u8)> = raw
        .split(',')
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }
            let (h, m) = part.split_once(':')?;
            let hour: u8 = h.trim().parse().ok()?;
            let minute: u8 = m.trim().parse().ok()?;
            if hour > 23 || minute > 59 {
                warn!("Ignoring out-of-range schedule slot: {}", part);
                return None;
            }
            Some((hour, minute))
        })
        .collect();

    slots.sort_unstable();
    slots.dedup();

    if slots.is_empty() {
        warn!("PIPELINE_SCHEDULE_UTC produced no valid slots; using defaults");
        DEFAULT_SLOTS.to_vec()
    } else {
        slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_default_when_unset() {
        assert_eq!(parse_schedule(None), vec![(0, 17), (9, 17)]);
    }

    #[test]
    fn schedule_parses_and_sorts() {
        assert_eq!(
            parse_schedule(Some("9:17, 0:17")),
            vec![(0, 17), (9, 17)]
        );
    }

    #[test]
    fn schedule_skips_invalid_entries() {
        assert_eq!(parse_schedule(Some("25:00,9:17")), vec![(9, 17)]);
        assert_eq!(parse_schedule(Some("garbage")), vec![(0, 17), (9, 17)]);
    }
}
