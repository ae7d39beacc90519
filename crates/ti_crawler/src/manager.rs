use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use ti_core::storage::ArticleStore;
use ti_core::{ArticleCollector, Clock, Result};
use tracing::{info, warn};

use crate::naver::NaverNewsClient;

/// Walks a trailing window of days, collecting search metadata for each day
/// and storing it. A failed day is logged and skipped, it does not end the
/// run.
pub struct CrawlManager {
    client: NaverNewsClient,
    store: Arc<dyn ArticleStore>,
    clock: Arc<dyn Clock>,
}

impl CrawlManager {
    pub fn new(client: NaverNewsClient, store: Arc<dyn ArticleStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            store,
            clock,
        }
    }

    /// Crawl the last `total_days` days (today included) for `keyword`.
    /// Returns the number of articles stored.
    pub async fn crawl_range(
        &self,
        keyword: &str,
        total_days: u32,
        pages_per_day: u32,
    ) -> Result<usize> {
        let today = self.clock.now().date_naive();
        let mut stored = 0usize;

        for offset in 0..total_days {
            let day = today - Duration::days(i64::from(offset));
            let articles = match self.client.search_day(keyword, day, pages_per_day).await {
                Ok(articles) => articles,
                Err(e) => {
                    warn!(keyword, %day, error = %e, "day crawl failed, skipping");
                    continue;
                }
            };

            for article in &articles {
                self.store.upsert_article(article).await?;
                stored += 1;
            }
        }

        info!(keyword, total_days, stored, "crawl finished");
        Ok(stored)
    }
}

#[async_trait]
impl ArticleCollector for CrawlManager {
    async fn collect(&self, keyword: &str, total_days: u32, pages_per_day: u32) -> Result<usize> {
        self.crawl_range(keyword, total_days, pages_per_day).await
    }
}
