use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ti_core::{IntermediateSummary, Result, SummaryStore, TextGenerator};
use tracing::{info, warn};

use crate::clean;
use crate::prompts;
use crate::retry::{generate_with_retry, RetryPolicy, Sleeper};

/// Returned when there is nothing to summarize.
pub const EMPTY_INPUT_SENTINEL: &str = "요약할 내용이 없습니다.";

#[derive(Debug, Clone)]
pub struct SummarizeOptions {
    /// Clamped to at least 2: a batch size of 1 would never converge.
    pub batch_size: usize,
    pub max_chars_per_batch: usize,
    pub retry: RetryPolicy,
    pub pacing: Duration,
}

impl Default for SummarizeOptions {
    fn default() -> Self {
        Self {
            batch_size: 3,
            max_chars_per_batch: 10_000,
            retry: RetryPolicy::default(),
            pacing: Duration::from_secs(1),
        }
    }
}

/// Condenses many texts into one summary, level by level.
///
/// Each level partitions the inputs into batches, summarizes every batch with
/// one model call, and feeds the batch summaries into the next level until a
/// level yields exactly one summary. Every batch summary is persisted keyed
/// `"{run_prefix}level{L}_batch{N}"` so a run can be audited afterwards.
pub struct HierarchicalSummarizer {
    model: Arc<dyn TextGenerator>,
    store: Arc<dyn SummaryStore>,
    sleeper: Arc<dyn Sleeper>,
    opts: SummarizeOptions,
}

impl HierarchicalSummarizer {
    pub fn new(
        model: Arc<dyn TextGenerator>,
        store: Arc<dyn SummaryStore>,
        sleeper: Arc<dyn Sleeper>,
        opts: SummarizeOptions,
    ) -> Self {
        Self {
            model,
            store,
            sleeper,
            opts,
        }
    }

    pub async fn summarize(&self, texts: &[String], run_prefix: &str) -> Result<String> {
        let mut current: Vec<String> = texts
            .iter()
            .filter(|t| !t.trim().is_empty())
            .cloned()
            .collect();
        if current.is_empty() {
            return Ok(EMPTY_INPUT_SENTINEL.to_string());
        }

        let batch_size = self.opts.batch_size.max(2);
        let mut level: u32 = 1;

        loop {
            let batches = partition(&current, batch_size, self.opts.max_chars_per_batch);
            info!(level, batches = batches.len(), "summarizing level");

            let mut next = Vec::with_capacity(batches.len());
            for (idx, batch) in batches.iter().enumerate() {
                if idx > 0 {
                    self.sleeper.sleep(self.opts.pacing).await;
                }

                let batch_no = idx + 1;
                let joined = batch.join("\n\n---\n\n");
                let prompt = prompts::combine_summaries(&joined);
                let summary = match generate_with_retry(
                    self.model.as_ref(),
                    &prompt,
                    &self.opts.retry,
                    self.sleeper.as_ref(),
                )
                .await
                {
                    Ok(text) => clean::flatten(&text),
                    Err(e) => {
                        warn!(level, batch = batch_no, error = %e, "batch summary failed");
                        format!("(요약 실패: level {level}, batch {batch_no})")
                    }
                };

                let record = IntermediateSummary {
                    batch_id: format!("{run_prefix}level{level}_batch{batch_no}"),
                    level,
                    text: summary.clone(),
                    created_at: Utc::now(),
                };
                if let Err(e) = self.store.save_intermediate(&record).await {
                    warn!(batch_id = %record.batch_id, error = %e, "failed to persist intermediate summary");
                }

                next.push(summary);
            }

            if next.len() == 1 {
                return Ok(next.remove(0));
            }
            if next.len() >= current.len() {
                // every batch held a single oversized item; another level
                // cannot shrink the set
                warn!(level, summaries = next.len(), "no reduction at this level, joining as-is");
                return Ok(next.join("\n\n"));
            }
            current = next;
            level += 1;
        }
    }
}

/// Greedy batching: close the open batch once it holds `batch_size` items or
/// adding the next item would push it past `max_chars`. The trailing partial
/// batch is always kept.
fn partition(texts: &[String], batch_size: usize, max_chars: usize) -> Vec<Vec<String>> {
    let mut batches = Vec::new();
    let mut batch: Vec<String> = Vec::new();
    let mut batch_chars = 0usize;

    for text in texts {
        let chars = text.chars().count();
        if !batch.is_empty() && (batch.len() >= batch_size || batch_chars + chars > max_chars) {
            batches.push(std::mem::take(&mut batch));
            batch_chars = 0;
        }
        batch_chars += chars;
        batch.push(text.clone());
    }
    if !batch.is_empty() {
        batches.push(batch);
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use ti_core::Error;

    use crate::retry::NoSleep;

    struct CountingModel {
        calls: AtomicU32,
        fail: bool,
    }

    impl CountingModel {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl TextGenerator for CountingModel {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail {
                Err(Error::Inference("model unavailable".to_string()))
            } else {
                Ok(format!("summary {n}"))
            }
        }

        async fn generate_structured(&self, _prompt: &str, _schema: &Value) -> Result<Value> {
            Err(Error::Inference("not used".to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        saved: Mutex<Vec<IntermediateSummary>>,
    }

    #[async_trait]
    impl SummaryStore for RecordingStore {
        async fn save_intermediate(&self, summary: &IntermediateSummary) -> Result<()> {
            self.saved.lock().unwrap().push(summary.clone());
            Ok(())
        }

        async fn intermediate_summaries(
            &self,
            level: u32,
            prefix: &str,
        ) -> Result<Vec<IntermediateSummary>> {
            Ok(self
                .saved
                .lock()
                .unwrap()
                .iter()
                .filter(|s| s.level == level && s.batch_id.starts_with(prefix))
                .cloned()
                .collect())
        }

        async fn clear_intermediate_summaries(&self) -> Result<()> {
            self.saved.lock().unwrap().clear();
            Ok(())
        }
    }

    fn opts() -> SummarizeOptions {
        SummarizeOptions {
            batch_size: 3,
            max_chars_per_batch: 10_000,
            retry: RetryPolicy {
                max_attempts: 1,
                delay: Duration::from_millis(0),
            },
            pacing: Duration::from_millis(0),
        }
    }

    fn texts(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("기사 요약 {i}")).collect()
    }

    #[tokio::test]
    async fn seven_texts_take_four_model_calls() {
        let model = CountingModel::new(false);
        let store = Arc::new(RecordingStore::default());
        let summarizer = HierarchicalSummarizer::new(
            model.clone(),
            store.clone(),
            Arc::new(NoSleep),
            opts(),
        );

        let out = summarizer.summarize(&texts(7), "run_").await.unwrap();
        // Level 1 batches (3,3,1) then level 2 batches the three results.
        assert_eq!(model.calls.load(Ordering::SeqCst), 4);
        assert_eq!(out, "summary 4");

        let level1 = store.intermediate_summaries(1, "run_").await.unwrap();
        let ids: Vec<&str> = level1.iter().map(|s| s.batch_id.as_str()).collect();
        assert_eq!(
            ids,
            ["run_level1_batch1", "run_level1_batch2", "run_level1_batch3"]
        );
        let level2 = store.intermediate_summaries(2, "run_").await.unwrap();
        assert_eq!(level2.len(), 1);
    }

    #[tokio::test]
    async fn single_text_is_still_summarized_once() {
        let model = CountingModel::new(false);
        let store = Arc::new(RecordingStore::default());
        let summarizer =
            HierarchicalSummarizer::new(model.clone(), store, Arc::new(NoSleep), opts());

        let out = summarizer.summarize(&texts(1), "run_").await.unwrap();
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
        assert_eq!(out, "summary 1");
    }

    #[tokio::test]
    async fn batch_failure_becomes_a_placeholder() {
        let model = CountingModel::new(true);
        let store = Arc::new(RecordingStore::default());
        let summarizer =
            HierarchicalSummarizer::new(model, store, Arc::new(NoSleep), opts());

        let out = summarizer.summarize(&texts(2), "run_").await.unwrap();
        assert!(out.contains("요약 실패"));
        assert!(out.contains("level 1"));
    }

    #[tokio::test]
    async fn empty_input_yields_sentinel_without_calls() {
        let model = CountingModel::new(false);
        let store = Arc::new(RecordingStore::default());
        let summarizer =
            HierarchicalSummarizer::new(model.clone(), store, Arc::new(NoSleep), opts());

        let out = summarizer.summarize(&[], "run_").await.unwrap();
        assert_eq!(out, EMPTY_INPUT_SENTINEL);
        let out = summarizer
            .summarize(&["   ".to_string()], "run_")
            .await
            .unwrap();
        assert_eq!(out, EMPTY_INPUT_SENTINEL);
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn oversized_items_still_terminate() {
        let model = CountingModel::new(false);
        let store = Arc::new(RecordingStore::default());
        let summarizer = HierarchicalSummarizer::new(
            model.clone(),
            store,
            Arc::new(NoSleep),
            SummarizeOptions {
                max_chars_per_batch: 10,
                ..opts()
            },
        );

        // every input alone exceeds the char cap, so a level cannot shrink
        // the set; one pass runs and its summaries come back joined
        let inputs = vec!["가".repeat(40), "나".repeat(40)];
        let out = summarizer.summarize(&inputs, "run_").await.unwrap();
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
        assert_eq!(out, "summary 1\n\nsummary 2");
    }

    #[test]
    fn partition_closes_on_item_count() {
        let batches = partition(&texts(7), 3, 10_000);
        let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, [3, 3, 1]);
    }

    #[test]
    fn partition_closes_on_char_limit() {
        let inputs = vec!["가".repeat(60), "나".repeat(60), "다".repeat(60)];
        let batches = partition(&inputs, 10, 100);
        let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, [1, 1, 1]);
    }

    #[test]
    fn partition_keeps_trailing_partial_batch() {
        let batches = partition(&texts(4), 3, 10_000);
        let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, [3, 1]);
    }
}
