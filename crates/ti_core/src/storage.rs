use async_trait::async_trait;
use chrono::NaiveDate;

use crate::types::{Article, IntermediateSummary, ScheduledTask, SearchProfile};
use crate::Result;

#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Insert an article, replacing any existing row with the same link.
    async fn upsert_article(&self, article: &Article) -> Result<()>;

    /// All stored articles, newest first.
    async fn all_articles(&self) -> Result<Vec<Article>>;

    async fn clear_articles(&self) -> Result<()>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Save a profile, replacing any existing one with the same name.
    async fn save_profile(&self, profile: &SearchProfile) -> Result<()>;

    async fn list_profiles(&self) -> Result<Vec<SearchProfile>>;

    async fn delete_profile(&self, name: &str) -> Result<()>;
}

#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Replace the active schedule. Only one scheduled task exists at a time.
    async fn set_schedule(&self, task: &ScheduledTask) -> Result<()>;

    async fn schedule(&self) -> Result<Option<ScheduledTask>>;

    /// Record the date the scheduled task last ran.
    async fn mark_run(&self, date: NaiveDate) -> Result<()>;

    async fn clear_schedule(&self) -> Result<()>;
}

/// Latest-only generated artifacts: the most recent clause text and the most
/// recent uploaded-document text. A write replaces the previous row.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn save_clause(&self, text: &str) -> Result<()>;

    async fn latest_clause(&self) -> Result<Option<String>>;

    async fn save_document_text(&self, text: &str) -> Result<()>;

    async fn latest_document_text(&self) -> Result<Option<String>>;
}

#[async_trait]
pub trait SummaryStore: Send + Sync {
    async fn save_intermediate(&self, summary: &IntermediateSummary) -> Result<()>;

    /// Intermediate summaries for a level whose batch id starts with `prefix`,
    /// in insertion order.
    async fn intermediate_summaries(
        &self,
        level: u32,
        prefix: &str,
    ) -> Result<Vec<IntermediateSummary>>;

    async fn clear_intermediate_summaries(&self) -> Result<()>;
}

/// Everything a backend must provide to back the full pipeline.
pub trait Store:
    ArticleStore + ProfileStore + ScheduleStore + ArtifactStore + SummaryStore
{
}

impl<T> Store for T where
    T: ArticleStore + ProfileStore + ScheduleStore + ArtifactStore + SummaryStore
{
}
