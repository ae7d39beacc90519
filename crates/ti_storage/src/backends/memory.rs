use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use ti_core::storage::{ArticleStore, ArtifactStore, ProfileStore, ScheduleStore, SummaryStore};
use ti_core::{Article, IntermediateSummary, Result, ScheduledTask, SearchProfile};

#[derive(Default)]
struct Inner {
    articles: Vec<Article>,
    profiles: Vec<SearchProfile>,
    schedule: Option<ScheduledTask>,
    clause: Option<String>,
    document: Option<String>,
    summaries: Vec<IntermediateSummary>,
}

/// In-memory backend. The default for the CLI and the double the rest of the
/// workspace tests against.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn upsert_article(&self, article: &Article) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.articles.iter_mut().find(|a| a.link == article.link) {
            *existing = article.clone();
        } else {
            inner.articles.push(article.clone());
        }
        Ok(())
    }

    async fn all_articles(&self) -> Result<Vec<Article>> {
        let inner = self.inner.read().await;
        let mut articles = inner.articles.clone();
        articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(articles)
    }

    async fn clear_articles(&self) -> Result<()> {
        self.inner.write().await.articles.clear();
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn save_profile(&self, profile: &SearchProfile) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.profiles.retain(|p| p.name != profile.name);
        inner.profiles.push(profile.clone());
        Ok(())
    }

    async fn list_profiles(&self) -> Result<Vec<SearchProfile>> {
        Ok(self.inner.read().await.profiles.clone())
    }

    async fn delete_profile(&self, name: &str) -> Result<()> {
        self.inner.write().await.profiles.retain(|p| p.name != name);
        Ok(())
    }
}

#[async_trait]
impl ScheduleStore for MemoryStore {
    async fn set_schedule(&self, task: &ScheduledTask) -> Result<()> {
        self.inner.write().await.schedule = Some(task.clone());
        Ok(())
    }

    async fn schedule(&self) -> Result<Option<ScheduledTask>> {
        Ok(self.inner.read().await.schedule.clone())
    }

    async fn mark_run(&self, date: NaiveDate) -> Result<()> {
        if let Some(task) = self.inner.write().await.schedule.as_mut() {
            task.last_run = Some(date);
        }
        Ok(())
    }

    async fn clear_schedule(&self) -> Result<()> {
        self.inner.write().await.schedule = None;
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn save_clause(&self, text: &str) -> Result<()> {
        self.inner.write().await.clause = Some(text.to_string());
        Ok(())
    }

    async fn latest_clause(&self) -> Result<Option<String>> {
        Ok(self.inner.read().await.clause.clone())
    }

    async fn save_document_text(&self, text: &str) -> Result<()> {
        self.inner.write().await.document = Some(text.to_string());
        Ok(())
    }

    async fn latest_document_text(&self) -> Result<Option<String>> {
        Ok(self.inner.read().await.document.clone())
    }
}

#[async_trait]
impl SummaryStore for MemoryStore {
    async fn save_intermediate(&self, summary: &IntermediateSummary) -> Result<()> {
        self.inner.write().await.summaries.push(summary.clone());
        Ok(())
    }

    async fn intermediate_summaries(
        &self,
        level: u32,
        prefix: &str,
    ) -> Result<Vec<IntermediateSummary>> {
        Ok(self
            .inner
            .read()
            .await
            .summaries
            .iter()
            .filter(|s| s.level == level && s.batch_id.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn clear_intermediate_summaries(&self) -> Result<()> {
        self.inner.write().await.summaries.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn article(link: &str, days_ago: i64) -> Article {
        let now = Utc.with_ymd_and_hms(2025, 6, 20, 9, 0, 0).unwrap();
        Article {
            title: format!("기사 {link}"),
            link: link.to_string(),
            published_at: Some(now.date_naive() - chrono::Duration::days(days_ago)),
            snippet: String::new(),
            collected_at: now,
        }
    }

    #[tokio::test]
    async fn upsert_replaces_by_link() {
        let store = MemoryStore::new();
        store.upsert_article(&article("a", 0)).await.unwrap();
        let mut updated = article("a", 0);
        updated.title = "수정된 제목".to_string();
        store.upsert_article(&updated).await.unwrap();

        let articles = store.all_articles().await.unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "수정된 제목");
    }

    #[tokio::test]
    async fn articles_come_back_newest_first() {
        let store = MemoryStore::new();
        store.upsert_article(&article("old", 5)).await.unwrap();
        store.upsert_article(&article("new", 0)).await.unwrap();

        let articles = store.all_articles().await.unwrap();
        assert_eq!(articles[0].link, "new");
        assert_eq!(articles[1].link, "old");
    }

    #[tokio::test]
    async fn profile_save_replaces_same_name() {
        let store = MemoryStore::new();
        let mut profile = SearchProfile {
            name: "ev".to_string(),
            keyword: "전기차".to_string(),
            total_window_days: 15,
            recent_window_days: 2,
            max_pages_per_day: 3,
        };
        store.save_profile(&profile).await.unwrap();
        profile.keyword = "자율주행".to_string();
        store.save_profile(&profile).await.unwrap();

        let profiles = store.list_profiles().await.unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].keyword, "자율주행");

        store.delete_profile(&profile.name).await.unwrap();
        assert!(store.list_profiles().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_one_schedule_exists() {
        let store = MemoryStore::new();
        let task = ScheduledTask {
            profile_name: "ev".to_string(),
            time_utc: chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            day: ti_core::ScheduleDay::Daily,
            recipients: vec!["a@example.com".to_string()],
            last_run: None,
        };
        store.set_schedule(&task).await.unwrap();
        let mut replacement = task.clone();
        replacement.profile_name = "battery".to_string();
        store.set_schedule(&replacement).await.unwrap();

        let current = store.schedule().await.unwrap().unwrap();
        assert_eq!(current.profile_name, "battery");

        let today = chrono::NaiveDate::from_ymd_opt(2025, 6, 20).unwrap();
        store.mark_run(today).await.unwrap();
        assert_eq!(store.schedule().await.unwrap().unwrap().last_run, Some(today));

        store.clear_schedule().await.unwrap();
        assert!(store.schedule().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn artifacts_keep_only_the_latest() {
        let store = MemoryStore::new();
        store.save_clause("첫 번째 특약").await.unwrap();
        store.save_clause("두 번째 특약").await.unwrap();
        assert_eq!(
            store.latest_clause().await.unwrap().as_deref(),
            Some("두 번째 특약")
        );

        assert!(store.latest_document_text().await.unwrap().is_none());
        store.save_document_text("문서 본문").await.unwrap();
        assert_eq!(
            store.latest_document_text().await.unwrap().as_deref(),
            Some("문서 본문")
        );
    }

    #[tokio::test]
    async fn intermediates_filter_by_level_and_prefix() {
        let store = MemoryStore::new();
        for (batch_id, level) in [("run_level1_batch1", 1), ("run_level1_batch2", 1), ("run_level2_batch1", 2), ("other_level1_batch1", 1)] {
            store
                .save_intermediate(&IntermediateSummary {
                    batch_id: batch_id.to_string(),
                    level,
                    text: "요약".to_string(),
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }

        let level1 = store.intermediate_summaries(1, "run_").await.unwrap();
        assert_eq!(level1.len(), 2);
        assert_eq!(level1[0].batch_id, "run_level1_batch1");

        store.clear_intermediate_summaries().await.unwrap();
        assert!(store.intermediate_summaries(1, "run_").await.unwrap().is_empty());
    }
}
