use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::Row;

use ti_core::storage::{ArticleStore, ArtifactStore, ProfileStore, ScheduleStore, SummaryStore};
use ti_core::{
    Article, Error, IntermediateSummary, Result, ScheduleDay, ScheduledTask, SearchProfile,
};

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        link TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        published_at TEXT,
        snippet TEXT NOT NULL,
        collected_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS search_profiles (
        name TEXT PRIMARY KEY,
        keyword TEXT NOT NULL,
        total_window_days INTEGER NOT NULL,
        recent_window_days INTEGER NOT NULL,
        max_pages_per_day INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS scheduled_tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        profile_name TEXT NOT NULL,
        time_utc TEXT NOT NULL,
        day TEXT NOT NULL,
        recipients TEXT NOT NULL,
        last_run TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS generated_clauses (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        text TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS document_texts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        text TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS intermediate_summaries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        batch_id TEXT NOT NULL,
        level INTEGER NOT NULL,
        text TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
];

fn storage_err(context: &str, e: impl std::fmt::Display) -> Error {
    Error::Storage(format!("{context}: {e}"))
}

fn day_to_str(day: ScheduleDay) -> &'static str {
    match day {
        ScheduleDay::Daily => "daily",
        ScheduleDay::Mon => "mon",
        ScheduleDay::Tue => "tue",
        ScheduleDay::Wed => "wed",
        ScheduleDay::Thu => "thu",
        ScheduleDay::Fri => "fri",
        ScheduleDay::Sat => "sat",
        ScheduleDay::Sun => "sun",
    }
}

fn day_from_str(s: &str) -> Result<ScheduleDay> {
    Ok(match s {
        "daily" => ScheduleDay::Daily,
        "mon" => ScheduleDay::Mon,
        "tue" => ScheduleDay::Tue,
        "wed" => ScheduleDay::Wed,
        "thu" => ScheduleDay::Thu,
        "fri" => ScheduleDay::Fri,
        "sat" => ScheduleDay::Sat,
        "sun" => ScheduleDay::Sun,
        other => return Err(Error::Storage(format!("unknown schedule day: {other}"))),
    })
}

/// SQLite backend, one pool per process. The schema is created on open.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| storage_err("failed to open database", e))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| storage_err(&format!("migration {i} failed"), e))?;
        }

        Ok(Self { pool })
    }
}

fn row_to_article(row: &sqlx::sqlite::SqliteRow) -> Result<Article> {
    let published_at: Option<String> = row.get("published_at");
    let collected_at: String = row.get("collected_at");
    Ok(Article {
        title: row.get("title"),
        link: row.get("link"),
        published_at: published_at
            .map(|s| NaiveDate::from_str(&s))
            .transpose()
            .map_err(|e| storage_err("bad published_at", e))?,
        snippet: row.get("snippet"),
        collected_at: DateTime::parse_from_rfc3339(&collected_at)
            .map_err(|e| storage_err("bad collected_at", e))?
            .with_timezone(&Utc),
    })
}

#[async_trait]
impl ArticleStore for SqliteStore {
    async fn upsert_article(&self, article: &Article) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO articles (link, title, published_at, snippet, collected_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&article.link)
        .bind(&article.title)
        .bind(article.published_at.map(|d| d.to_string()))
        .bind(&article.snippet)
        .bind(article.collected_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| storage_err("failed to upsert article", e))?;
        Ok(())
    }

    async fn all_articles(&self) -> Result<Vec<Article>> {
        let rows = sqlx::query("SELECT * FROM articles ORDER BY published_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_err("failed to fetch articles", e))?;
        rows.iter().map(row_to_article).collect()
    }

    async fn clear_articles(&self) -> Result<()> {
        sqlx::query("DELETE FROM articles")
            .execute(&self.pool)
            .await
            .map_err(|e| storage_err("failed to clear articles", e))?;
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for SqliteStore {
    async fn save_profile(&self, profile: &SearchProfile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO search_profiles
            (name, keyword, total_window_days, recent_window_days, max_pages_per_day)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&profile.name)
        .bind(&profile.keyword)
        .bind(profile.total_window_days as i64)
        .bind(profile.recent_window_days as i64)
        .bind(profile.max_pages_per_day as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| storage_err("failed to save profile", e))?;
        Ok(())
    }

    async fn list_profiles(&self) -> Result<Vec<SearchProfile>> {
        let rows = sqlx::query("SELECT * FROM search_profiles ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_err("failed to list profiles", e))?;
        Ok(rows
            .iter()
            .map(|row| SearchProfile {
                name: row.get("name"),
                keyword: row.get("keyword"),
                total_window_days: row.get::<i64, _>("total_window_days") as u32,
                recent_window_days: row.get::<i64, _>("recent_window_days") as u32,
                max_pages_per_day: row.get::<i64, _>("max_pages_per_day") as u32,
            })
            .collect())
    }

    async fn delete_profile(&self, name: &str) -> Result<()> {
        sqlx::query("DELETE FROM search_profiles WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_err("failed to delete profile", e))?;
        Ok(())
    }
}

#[async_trait]
impl ScheduleStore for SqliteStore {
    async fn set_schedule(&self, task: &ScheduledTask) -> Result<()> {
        // Single active schedule: drop the old row before inserting.
        sqlx::query("DELETE FROM scheduled_tasks")
            .execute(&self.pool)
            .await
            .map_err(|e| storage_err("failed to replace schedule", e))?;
        sqlx::query(
            r#"
            INSERT INTO scheduled_tasks (profile_name, time_utc, day, recipients, last_run)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&task.profile_name)
        .bind(task.time_utc.format("%H:%M").to_string())
        .bind(day_to_str(task.day))
        .bind(task.recipients.join(","))
        .bind(task.last_run.map(|d| d.to_string()))
        .execute(&self.pool)
        .await
        .map_err(|e| storage_err("failed to save schedule", e))?;
        Ok(())
    }

    async fn schedule(&self) -> Result<Option<ScheduledTask>> {
        let row = sqlx::query("SELECT * FROM scheduled_tasks LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_err("failed to fetch schedule", e))?;
        let Some(row) = row else { return Ok(None) };

        let time_utc: String = row.get("time_utc");
        let day: String = row.get("day");
        let recipients: String = row.get("recipients");
        let last_run: Option<String> = row.get("last_run");
        Ok(Some(ScheduledTask {
            profile_name: row.get("profile_name"),
            time_utc: NaiveTime::parse_from_str(&time_utc, "%H:%M")
                .map_err(|e| storage_err("bad schedule time", e))?,
            day: day_from_str(&day)?,
            recipients: recipients
                .split(',')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            last_run: last_run
                .map(|s| NaiveDate::from_str(&s))
                .transpose()
                .map_err(|e| storage_err("bad last_run date", e))?,
        }))
    }

    async fn mark_run(&self, date: NaiveDate) -> Result<()> {
        sqlx::query("UPDATE scheduled_tasks SET last_run = ?")
            .bind(date.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| storage_err("failed to mark schedule run", e))?;
        Ok(())
    }

    async fn clear_schedule(&self) -> Result<()> {
        sqlx::query("DELETE FROM scheduled_tasks")
            .execute(&self.pool)
            .await
            .map_err(|e| storage_err("failed to clear schedule", e))?;
        Ok(())
    }
}

impl SqliteStore {
    async fn save_latest(&self, table: &str, text: &str) -> Result<()> {
        sqlx::query(&format!("DELETE FROM {table}"))
            .execute(&self.pool)
            .await
            .map_err(|e| storage_err("failed to replace artifact", e))?;
        sqlx::query(&format!(
            "INSERT INTO {table} (text, created_at) VALUES (?, ?)"
        ))
        .bind(text)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| storage_err("failed to save artifact", e))?;
        Ok(())
    }

    async fn latest(&self, table: &str) -> Result<Option<String>> {
        let row = sqlx::query(&format!(
            "SELECT text FROM {table} ORDER BY id DESC LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_err("failed to fetch artifact", e))?;
        Ok(row.map(|r| r.get("text")))
    }
}

#[async_trait]
impl ArtifactStore for SqliteStore {
    async fn save_clause(&self, text: &str) -> Result<()> {
        self.save_latest("generated_clauses", text).await
    }

    async fn latest_clause(&self) -> Result<Option<String>> {
        self.latest("generated_clauses").await
    }

    async fn save_document_text(&self, text: &str) -> Result<()> {
        self.save_latest("document_texts", text).await
    }

    async fn latest_document_text(&self) -> Result<Option<String>> {
        self.latest("document_texts").await
    }
}

#[async_trait]
impl SummaryStore for SqliteStore {
    async fn save_intermediate(&self, summary: &IntermediateSummary) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO intermediate_summaries (batch_id, level, text, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&summary.batch_id)
        .bind(summary.level as i64)
        .bind(&summary.text)
        .bind(summary.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| storage_err("failed to save intermediate summary", e))?;
        Ok(())
    }

    async fn intermediate_summaries(
        &self,
        level: u32,
        prefix: &str,
    ) -> Result<Vec<IntermediateSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT batch_id, level, text, created_at FROM intermediate_summaries
            WHERE level = ? AND batch_id LIKE ? || '%'
            ORDER BY id
            "#,
        )
        .bind(level as i64)
        .bind(prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_err("failed to fetch intermediate summaries", e))?;

        rows.iter()
            .map(|row| {
                let created_at: String = row.get("created_at");
                Ok(IntermediateSummary {
                    batch_id: row.get("batch_id"),
                    level: row.get::<i64, _>("level") as u32,
                    text: row.get("text"),
                    created_at: DateTime::parse_from_rfc3339(&created_at)
                        .map_err(|e| storage_err("bad created_at", e))?
                        .with_timezone(&Utc),
                })
            })
            .collect()
    }

    async fn clear_intermediate_summaries(&self) -> Result<()> {
        sqlx::query("DELETE FROM intermediate_summaries")
            .execute(&self.pool)
            .await
            .map_err(|e| storage_err("failed to clear intermediate summaries", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn open_temp() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("ti.db")).await.unwrap();
        (dir, store)
    }

    fn article(link: &str, days_ago: i64) -> Article {
        let now = Utc.with_ymd_and_hms(2025, 6, 20, 9, 0, 0).unwrap();
        Article {
            title: format!("기사 {link}"),
            link: link.to_string(),
            published_at: Some(now.date_naive() - chrono::Duration::days(days_ago)),
            snippet: "미리보기".to_string(),
            collected_at: now,
        }
    }

    #[tokio::test]
    async fn articles_round_trip_and_upsert() {
        let (_dir, store) = open_temp().await;
        store.upsert_article(&article("a", 3)).await.unwrap();
        store.upsert_article(&article("b", 0)).await.unwrap();

        let mut updated = article("a", 3);
        updated.title = "수정".to_string();
        store.upsert_article(&updated).await.unwrap();

        let articles = store.all_articles().await.unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].link, "b");
        assert_eq!(articles[1].title, "수정");
    }

    #[tokio::test]
    async fn undated_article_survives_storage() {
        let (_dir, store) = open_temp().await;
        let mut a = article("undated", 0);
        a.published_at = None;
        store.upsert_article(&a).await.unwrap();
        assert_eq!(store.all_articles().await.unwrap()[0].published_at, None);
    }

    #[tokio::test]
    async fn schedule_is_single_row_with_replacement() {
        let (_dir, store) = open_temp().await;
        let task = ScheduledTask {
            profile_name: "ev".to_string(),
            time_utc: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            day: ScheduleDay::Fri,
            recipients: vec!["a@example.com".to_string(), "b@example.com".to_string()],
            last_run: None,
        };
        store.set_schedule(&task).await.unwrap();
        let mut replacement = task.clone();
        replacement.day = ScheduleDay::Daily;
        store.set_schedule(&replacement).await.unwrap();

        let current = store.schedule().await.unwrap().unwrap();
        assert_eq!(current.day, ScheduleDay::Daily);
        assert_eq!(current.recipients.len(), 2);
        assert_eq!(current.time_utc, task.time_utc);

        let today = NaiveDate::from_ymd_opt(2025, 6, 20).unwrap();
        store.mark_run(today).await.unwrap();
        assert_eq!(store.schedule().await.unwrap().unwrap().last_run, Some(today));
    }

    #[tokio::test]
    async fn clause_keeps_latest_only() {
        let (_dir, store) = open_temp().await;
        store.save_clause("첫 번째").await.unwrap();
        store.save_clause("두 번째").await.unwrap();
        assert_eq!(
            store.latest_clause().await.unwrap().as_deref(),
            Some("두 번째")
        );
    }

    #[tokio::test]
    async fn intermediates_query_by_level_and_prefix() {
        let (_dir, store) = open_temp().await;
        for (batch_id, level) in [("r_level1_batch1", 1), ("r_level1_batch2", 1), ("x_level1_batch1", 1)] {
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
        let found = store.intermediate_summaries(1, "r_").await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].batch_id, "r_level1_batch1");
    }
}
