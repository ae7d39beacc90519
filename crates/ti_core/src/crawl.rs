use async_trait::async_trait;

use crate::Result;

/// The seam to the news collector. The report pipeline refreshes the article
/// store through this before analyzing, so a scheduled run never reports
/// over a stale store.
#[async_trait]
pub trait ArticleCollector: Send + Sync {
    /// Collect the last `total_days` days (today included) for `keyword` and
    /// store what was found. Returns the number of articles stored.
    async fn collect(&self, keyword: &str, total_days: u32, pages_per_day: u32) -> Result<usize>;
}
