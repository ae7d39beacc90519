use std::collections::HashMap;

use chrono::Duration;
use ti_core::{Article, Clock, KeywordObservation, Surge};
use tracing::warn;

use crate::keywords::KeywordExtractor;

/// Window and threshold parameters for a trend analysis run.
///
/// Callers are responsible for `recent_window_days < total_window_days`; the
/// windowing below assumes it.
#[derive(Debug, Clone, Copy)]
pub struct TrendParams {
    pub recent_window_days: i64,
    pub total_window_days: i64,
    pub min_surge_ratio: f64,
    pub min_recent_freq: u32,
}

impl Default for TrendParams {
    fn default() -> Self {
        Self {
            recent_window_days: 2,
            total_window_days: 15,
            min_surge_ratio: 1.5,
            min_recent_freq: 3,
        }
    }
}

/// Partition `articles` into recent/past windows, count keyword mentions per
/// window, and score surge ratios. Pure function of its inputs plus the
/// injected clock.
///
/// An article with no parseable date counts as published today. Articles
/// outside `[today - total_window_days, today]` are excluded. The result is
/// ordered by descending recent frequency.
pub fn analyze_trends(
    articles: &[Article],
    extractor: &KeywordExtractor,
    params: &TrendParams,
    clock: &dyn Clock,
) -> Vec<KeywordObservation> {
    if articles.is_empty() {
        return Vec::new();
    }

    let today = clock.now().date_naive();
    let recent_cutoff = today - Duration::days(params.recent_window_days);
    let past_cutoff = today - Duration::days(params.total_window_days);

    let mut recent_counts: HashMap<String, u32> = HashMap::new();
    let mut past_counts: HashMap<String, u32> = HashMap::new();

    for article in articles {
        let date = match article.published_at {
            Some(date) => date,
            None => {
                warn!(
                    title = %article.title,
                    "article has no parseable date, counting it as published today"
                );
                today
            }
        };

        if date < past_cutoff || date > today {
            continue;
        }

        let counts = if date >= recent_cutoff {
            &mut recent_counts
        } else {
            &mut past_counts
        };

        let text = format!("{} {}", article.title, article.snippet);
        for keyword in extractor.extract(&text) {
            *counts.entry(keyword).or_insert(0) += 1;
        }
    }

    let mut observations = Vec::new();
    for (keyword, recent_freq) in recent_counts {
        if recent_freq < params.min_recent_freq {
            continue;
        }

        let past_freq = past_counts.get(&keyword).copied().unwrap_or(0);
        let surge = if past_freq == 0 {
            // Unseen in the past window: an unbounded "new trend" signal,
            // included regardless of the surge-ratio floor.
            Surge::New
        } else {
            let ratio = recent_freq as f64 / past_freq as f64;
            if ratio < params.min_surge_ratio {
                continue;
            }
            Surge::Ratio(ratio)
        };

        observations.push(KeywordObservation {
            keyword,
            recent_freq,
            past_freq,
            surge,
        });
    }

    observations.sort_by(|a, b| b.recent_freq.cmp(&a.recent_freq));
    observations
}
