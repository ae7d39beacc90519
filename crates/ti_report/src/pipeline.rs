use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use ti_core::storage::{ArticleStore, ArtifactStore, Store, SummaryStore};
use ti_core::{
    Article, ArticleCollector, Clock, KeywordObservation, Result, SearchProfile, TextGenerator,
};
use ti_inference::clean::{clean_report, flatten};
use ti_inference::prompts;
use ti_inference::retry::{
    generate_structured_with_retry, generate_with_retry, RetryPolicy, Sleeper,
};
use ti_inference::summarize::{HierarchicalSummarizer, SummarizeOptions};
use ti_trend::detector::{analyze_trends, TrendParams};
use ti_trend::keywords::KeywordExtractor;
use tracing::{info, warn};

const MAX_SELECTED_KEYWORDS: usize = 5;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub trend: TrendParams,
    pub summarize: SummarizeOptions,
    pub retry: RetryPolicy,
    /// The lens the model uses when picking keywords and drawing implications.
    pub perspective: String,
    pub max_articles: usize,
    pub generate_clause: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            trend: TrendParams::default(),
            summarize: SummarizeOptions::default(),
            retry: RetryPolicy::default(),
            perspective: "자동차 보험 산업".to_string(),
            max_articles: 10,
            generate_clause: true,
        }
    }
}

/// Per-run state. Each run gets a fresh one; nothing about a run lives in
/// globals.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub profile_name: String,
    pub run_prefix: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArticleSummary {
    pub title: String,
    pub link: String,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendReport {
    pub profile_name: String,
    pub observations: Vec<KeywordObservation>,
    pub selected_keywords: Vec<String>,
    pub article_summaries: Vec<ArticleSummary>,
    pub narrative: String,
    pub implications: String,
    pub formatted: String,
    pub clause: Option<String>,
}

/// The full report run: article collection, trend detection, model-driven
/// keyword selection, per-article summaries, hierarchical combination,
/// industry implications, and the formatted report with its clause artifact.
/// Strictly sequential; every stage degrades instead of aborting the run.
pub struct ReportPipeline {
    store: Arc<dyn Store>,
    summary_store: Arc<dyn SummaryStore>,
    collector: Option<Arc<dyn ArticleCollector>>,
    model: Arc<dyn TextGenerator>,
    extractor: KeywordExtractor,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
    opts: PipelineOptions,
}

impl ReportPipeline {
    pub fn new<S: Store + 'static>(
        store: Arc<S>,
        model: Arc<dyn TextGenerator>,
        extractor: KeywordExtractor,
        clock: Arc<dyn Clock>,
        sleeper: Arc<dyn Sleeper>,
        opts: PipelineOptions,
    ) -> Self {
        Self {
            store: store.clone(),
            summary_store: store,
            collector: None,
            model,
            extractor,
            clock,
            sleeper,
            opts,
        }
    }

    /// Collector used to refresh the article store at the start of each run.
    /// Without one the pipeline reports over whatever is already stored.
    pub fn with_collector(mut self, collector: Arc<dyn ArticleCollector>) -> Self {
        self.collector = Some(collector);
        self
    }

    pub async fn run(&self, profile: &SearchProfile) -> Result<TrendReport> {
        let started_at = self.clock.now();
        let ctx = RunContext {
            profile_name: profile.name.clone(),
            run_prefix: format!("report_{}_", started_at.format("%Y%m%d%H%M%S")),
            started_at,
        };
        info!(profile = %ctx.profile_name, prefix = %ctx.run_prefix, "starting report run");

        if let Some(collector) = &self.collector {
            match collector
                .collect(
                    &profile.keyword,
                    profile.total_window_days,
                    profile.max_pages_per_day,
                )
                .await
            {
                Ok(stored) => info!(keyword = %profile.keyword, stored, "article store refreshed"),
                Err(e) => {
                    warn!(error = %e, "collection failed, reporting over stored articles")
                }
            }
        }

        let articles = self.store.all_articles().await?;
        let observations = self.detect(profile, &articles);
        let selected_keywords = self.select_keywords(&observations).await;
        let recent_cutoff =
            started_at.date_naive() - Duration::days(i64::from(profile.recent_window_days));
        let matching = matching_articles(
            &articles,
            &selected_keywords,
            recent_cutoff,
            self.opts.max_articles,
        );
        let article_summaries = self.summarize_articles(&matching).await;

        self.store.clear_intermediate_summaries().await?;
        let summarizer = HierarchicalSummarizer::new(
            self.model.clone(),
            self.summary_store.clone(),
            self.sleeper.clone(),
            self.opts.summarize.clone(),
        );
        let texts: Vec<String> = article_summaries.iter().map(|s| s.summary.clone()).collect();
        let narrative = summarizer.summarize(&texts, &ctx.run_prefix).await?;

        let implications = self.implications(&narrative).await;
        let formatted = self
            .format(&ctx, &observations, &selected_keywords, &article_summaries, &narrative, &implications)
            .await;

        let clause = if self.opts.generate_clause {
            let clause = self.generate_clause(&formatted).await;
            if let Err(e) = self.store.save_clause(&clause).await {
                warn!(error = %e, "failed to persist generated clause");
            }
            Some(clause)
        } else {
            None
        };

        Ok(TrendReport {
            profile_name: ctx.profile_name,
            observations,
            selected_keywords,
            article_summaries,
            narrative,
            implications,
            formatted,
            clause,
        })
    }

    fn detect(&self, profile: &SearchProfile, articles: &[Article]) -> Vec<KeywordObservation> {
        let params = TrendParams {
            recent_window_days: i64::from(profile.recent_window_days),
            total_window_days: i64::from(profile.total_window_days),
            ..self.opts.trend
        };
        analyze_trends(articles, &self.extractor, &params, self.clock.as_ref())
    }

    /// Model-picked keywords; any failure or an empty pick falls back to the
    /// top ranked observations.
    async fn select_keywords(&self, observations: &[KeywordObservation]) -> Vec<String> {
        if observations.is_empty() {
            return Vec::new();
        }

        let prompt = prompts::relevant_keywords(observations, &self.opts.perspective);
        let schema = prompts::relevant_keywords_schema();
        let picked = match generate_structured_with_retry(
            self.model.as_ref(),
            &prompt,
            &schema,
            &self.opts.retry,
            self.sleeper.as_ref(),
        )
        .await
        {
            Ok(Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .take(MAX_SELECTED_KEYWORDS)
                .collect::<Vec<_>>(),
            Ok(other) => {
                warn!(got = %other, "keyword selection returned a non-array, falling back");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "keyword selection failed, falling back");
                Vec::new()
            }
        };

        if picked.is_empty() {
            observations
                .iter()
                .take(MAX_SELECTED_KEYWORDS)
                .map(|o| o.keyword.clone())
                .collect()
        } else {
            picked
        }
    }

    async fn summarize_articles(&self, articles: &[Article]) -> Vec<ArticleSummary> {
        let mut summaries = Vec::with_capacity(articles.len());
        for (idx, article) in articles.iter().enumerate() {
            if idx > 0 {
                self.sleeper.sleep(self.opts.summarize.pacing).await;
            }
            let date = article
                .published_at
                .map(|d| d.to_string())
                .unwrap_or_else(|| "알 수 없음".to_string());
            let prompt =
                prompts::article_summary(&article.title, &article.link, &date, &article.snippet);
            let summary = match generate_with_retry(
                self.model.as_ref(),
                &prompt,
                &self.opts.retry,
                self.sleeper.as_ref(),
            )
            .await
            {
                Ok(text) => flatten(&text),
                Err(e) => {
                    warn!(link = %article.link, error = %e, "article summary failed");
                    format!("(요약 실패: {})", article.title)
                }
            };
            summaries.push(ArticleSummary {
                title: article.title.clone(),
                link: article.link.clone(),
                summary,
            });
        }
        summaries
    }

    async fn implications(&self, narrative: &str) -> String {
        let prompt = prompts::industry_implications(narrative);
        match generate_with_retry(
            self.model.as_ref(),
            &prompt,
            &self.opts.retry,
            self.sleeper.as_ref(),
        )
        .await
        {
            Ok(text) => flatten(&text),
            Err(e) => {
                warn!(error = %e, "implications stage failed");
                "산업 영향 분석을 생성하지 못했습니다.".to_string()
            }
        }
    }

    async fn format(
        &self,
        ctx: &RunContext,
        observations: &[KeywordObservation],
        selected: &[String],
        article_summaries: &[ArticleSummary],
        narrative: &str,
        implications: &str,
    ) -> String {
        let draft = compose_draft(ctx, observations, selected, article_summaries, narrative, implications);
        match generate_with_retry(
            self.model.as_ref(),
            &prompts::format_report(&draft),
            &self.opts.retry,
            self.sleeper.as_ref(),
        )
        .await
        {
            Ok(text) => clean_report(&text),
            Err(e) => {
                warn!(error = %e, "report formatting failed, using the draft");
                clean_report(&draft)
            }
        }
    }

    /// One model call per clause section; a failed section becomes a
    /// placeholder so the clause always has the full outline.
    async fn generate_clause(&self, report: &str) -> String {
        let mut clause = String::new();
        for (idx, (title, question)) in prompts::CLAUSE_SECTIONS.iter().enumerate() {
            if idx > 0 {
                self.sleeper.sleep(self.opts.summarize.pacing).await;
            }
            let prompt = prompts::clause_section(title, question, report);
            let answer = match generate_with_retry(
                self.model.as_ref(),
                &prompt,
                &self.opts.retry,
                self.sleeper.as_ref(),
            )
            .await
            {
                Ok(text) => flatten(&text),
                Err(e) => {
                    warn!(section = title, error = %e, "clause section failed");
                    "(작성 실패)".to_string()
                }
            };
            clause.push_str(&format!("#### {title}\n{answer}\n\n"));
        }
        clause
    }
}

/// Candidates for per-article summarization: inside the recent window (an
/// undated article counts as recent, matching the detector) and mentioning a
/// selected keyword.
fn matching_articles(
    articles: &[Article],
    keywords: &[String],
    recent_cutoff: NaiveDate,
    cap: usize,
) -> Vec<Article> {
    if keywords.is_empty() {
        return Vec::new();
    }
    articles
        .iter()
        .filter(|a| a.published_at.map_or(true, |d| d >= recent_cutoff))
        .filter(|a| {
            keywords
                .iter()
                .any(|k| a.title.contains(k.as_str()) || a.snippet.contains(k.as_str()))
        })
        .take(cap)
        .cloned()
        .collect()
}

fn compose_draft(
    ctx: &RunContext,
    observations: &[KeywordObservation],
    selected: &[String],
    article_summaries: &[ArticleSummary],
    narrative: &str,
    implications: &str,
) -> String {
    let mut draft = format!(
        "# 뉴스 트렌드 분석 보고서\n\n프로필: {} / 기준 시각: {}\n\n",
        ctx.profile_name,
        ctx.started_at.format("%Y-%m-%d %H:%M")
    );

    draft.push_str("## 트렌드 키워드\n\n");
    if observations.is_empty() {
        draft.push_str("탐지된 트렌드 키워드가 없습니다.\n\n");
    } else {
        for o in observations {
            draft.push_str(&format!(
                "- {} (최근 {}회, 과거 {}회, 급상승 {})\n",
                o.keyword, o.recent_freq, o.past_freq, o.surge
            ));
        }
        draft.push('\n');
    }

    if !selected.is_empty() {
        draft.push_str(&format!("선별된 키워드: {}\n\n", selected.join(", ")));
    }

    draft.push_str("## 트렌드 요약\n\n");
    draft.push_str(narrative);
    draft.push_str("\n\n## 산업 시사점\n\n");
    draft.push_str(implications);

    draft.push_str("\n\n## 반영된 기사\n\n");
    if article_summaries.is_empty() {
        draft.push_str("반영된 기사가 없습니다.\n");
    } else {
        for s in article_summaries {
            draft.push_str(&format!("### {}\n{}\n링크: {}\n\n", s.title, s.summary, s.link));
        }
    }

    draft
}
