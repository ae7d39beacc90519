use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// One news article as collected from a search-result page.
///
/// `link` is the unique key; `published_at` is `None` when the source date
/// could not be parsed (the trend detector treats that as "today").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub link: String,
    pub published_at: Option<NaiveDate>,
    pub snippet: String,
    pub collected_at: DateTime<Utc>,
}

/// Surge strength of a keyword between the past and recent windows.
///
/// `New` marks a keyword unseen in the past window; its surge is unbounded
/// and it is always reported once it clears the recent-frequency floor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Surge {
    New,
    Ratio(f64),
}

impl std::fmt::Display for Surge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Surge::New => write!(f, "new"),
            Surge::Ratio(r) => write!(f, "{:.2}", r),
        }
    }
}

/// A trending keyword with its per-window frequencies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordObservation {
    pub keyword: String,
    pub recent_freq: u32,
    pub past_freq: u32,
    pub surge: Surge,
}

/// Named preset of search/analysis parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchProfile {
    pub name: String,
    pub keyword: String,
    pub total_window_days: u32,
    pub recent_window_days: u32,
    pub max_pages_per_day: u32,
}

/// Day rule for the scheduled report run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleDay {
    Daily,
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl ScheduleDay {
    pub fn matches(&self, weekday: Weekday) -> bool {
        match self {
            ScheduleDay::Daily => true,
            ScheduleDay::Mon => weekday == Weekday::Mon,
            ScheduleDay::Tue => weekday == Weekday::Tue,
            ScheduleDay::Wed => weekday == Weekday::Wed,
            ScheduleDay::Thu => weekday == Weekday::Thu,
            ScheduleDay::Fri => weekday == Weekday::Fri,
            ScheduleDay::Sat => weekday == Weekday::Sat,
            ScheduleDay::Sun => weekday == Weekday::Sun,
        }
    }
}

/// The single active scheduled report run. At most one exists at a time;
/// saving a new one replaces the old.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub profile_name: String,
    pub time_utc: NaiveTime,
    pub day: ScheduleDay,
    pub recipients: Vec<String>,
    pub last_run: Option<NaiveDate>,
}

/// An intermediate batch summary persisted for auditability during
/// hierarchical summarization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntermediateSummary {
    pub batch_id: String,
    pub level: u32,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_day_matches_weekday() {
        assert!(ScheduleDay::Daily.matches(Weekday::Tue));
        assert!(ScheduleDay::Mon.matches(Weekday::Mon));
        assert!(!ScheduleDay::Mon.matches(Weekday::Tue));
    }

    #[test]
    fn surge_display() {
        assert_eq!(Surge::New.to_string(), "new");
        assert_eq!(Surge::Ratio(3.0).to_string(), "3.00");
    }
}
