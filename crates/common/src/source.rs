use async_trait::async_trait;

use crate::types::Item;

/// One upstream feed family.
///
/// Adapters fail in isolation: any network, parse, or auth error is logged
/// inside the adapter and surfaces as an empty list, never as an `Err`.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Collect items published within the last `window_hours`.
    async fn collect(&self, window_hours: i64) -> Vec<Item>;
}
