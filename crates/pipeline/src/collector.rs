use std::collections::HashSet;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{info, warn};

use common::{canonicalize_url, Item, SourceAdapter};

/// Run every adapter concurrently, then merge in the order the adapters were
/// given. That order is the dedup priority: the caller passes curated
/// sources first, so a duplicate URL from a lower-priority source is dropped.
pub async fn collect_all(adapters: &[Arc<dyn SourceAdapter>], window_hours: i64) -> Vec<Item> {
    let mut tasks = JoinSet::new();
    for (index, adapter) in adapters.iter().enumerate() {
        let adapter = adapter.clone();
        tasks.spawn(async move {
            let name = adapter.name();
            let items = adapter.collect(window_hours).await;
            info!("{}: {} items", name, items.len());
            (index, items)
        });
    }

    let mut buckets: Vec<Vec<Item>> = Vec::new();
    buckets.resize_with(adapters.len(), Vec::new);
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, items)) => buckets[index] = items,
            Err(e) => warn!("adapter task failed: {}", e),
        }
    }

    dedup_merge(buckets)
}

/// First occurrence of each canonical URL wins.
pub fn dedup_merge(buckets: Vec<Vec<Item>>) -> Vec<Item> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::new();

    for bucket in buckets {
        for item in bucket {
            if seen.insert(canonicalize_url(&item.link)) {
                merged.push(item);
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Lang, Tier};
    use time::OffsetDateTime;

    fn item(link: &str, tier: Tier) -> Item {
        Item {
            title: "t".to_string(),
            link: link.to_string(),
            published_at: OffsetDateTime::UNIX_EPOCH,
            summary: String::new(),
            source_domain: "example.com".to_string(),
            feed_title: "f".to_string(),
            tier,
            lang: Lang::En,
        }
    }

    #[test]
    fn first_bucket_wins_on_duplicate_urls() {
        let curated = vec![item("https://example.com/a", Tier::P0Curated)];
        let raw = vec![
            item("https://example.com/a?utm_source=feed", Tier::P2Raw),
            item("https://example.com/b", Tier::P2Raw),
        ];

        let merged = dedup_merge(vec![curated, raw]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].tier, Tier::P0Curated);
        assert_eq!(merged[1].link, "https://example.com/b");
    }

    #[test]
    fn all_links_unique_after_merge() {
        let a = vec![item("https://x.com/1", Tier::Community)];
        let b = vec![item("https://x.com/1#frag", Tier::Community)];
        let merged = dedup_merge(vec![a, b]);
        assert_eq!(merged.len(), 1);
    }
}
