use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

/// Run `f` over `items` with at most `limit` tasks in flight.
///
/// Results come back in input order. A panicking task drops its slot from
/// the output after a warning; the other tasks are unaffected.
pub async fn run_bounded<T, R, F, Fut>(limit: usize, items: Vec<T>, f: F) -> Vec<R>
where
    R: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = R> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut tasks = JoinSet::new();

    for (idx, item) in items.into_iter().enumerate() {
        let fut = f(item);
        let semaphore = semaphore.clone();
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            (idx, fut.await)
        });
    }

    let mut results: Vec<(usize, R)> = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(pair) => results.push(pair),
            Err(e) => warn!("worker task failed: {}", e),
        }
    }

    results.sort_by_key(|(idx, _)| *idx);
    results.into_iter().map(|(_, r)| r).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn preserves_input_order() {
        let out = run_bounded(2, vec![3u64, 1, 2], |n| async move {
            tokio::time::sleep(std::time::Duration::from_millis(n * 10)).await;
            n
        })
        .await;
        assert_eq!(out, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn respects_concurrency_limit() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let items: Vec<_> = (0..8)
            .map(|_| (active.clone(), peak.clone()))
            .collect();

        run_bounded(3, items, |(active, peak)| async move {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            active.fetch_sub(1, Ordering::SeqCst);
        })
        .await;

        assert!(peak.load(Ordering::SeqCst) <= 3);
    }
}
