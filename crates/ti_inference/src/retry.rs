use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use ti_core::{Result, TextGenerator};
use tracing::warn;

/// Injectable delay source so retry tests run without wall-clock sleeps.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

pub struct NoSleep;

#[async_trait]
impl Sleeper for NoSleep {
    async fn sleep(&self, _duration: Duration) {}
}

/// `max_attempts` is the total number of calls made, not the number of
/// retries after the first failure.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

pub async fn generate_with_retry(
    model: &dyn TextGenerator,
    prompt: &str,
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
) -> Result<String> {
    let attempts = policy.max_attempts.max(1);
    let mut last_err = None;
    for attempt in 1..=attempts {
        match model.generate(prompt).await {
            Ok(text) => return Ok(text),
            Err(e) => {
                warn!(attempt, max = attempts, error = %e, "generation attempt failed");
                last_err = Some(e);
                if attempt < attempts {
                    sleeper.sleep(policy.delay).await;
                }
            }
        }
    }
    Err(last_err.expect("at least one attempt was made"))
}

pub async fn generate_structured_with_retry(
    model: &dyn TextGenerator,
    prompt: &str,
    schema: &Value,
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
) -> Result<Value> {
    let attempts = policy.max_attempts.max(1);
    let mut last_err = None;
    for attempt in 1..=attempts {
        match model.generate_structured(prompt, schema).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(attempt, max = attempts, error = %e, "structured generation attempt failed");
                last_err = Some(e);
                if attempt < attempts {
                    sleeper.sleep(policy.delay).await;
                }
            }
        }
    }
    Err(last_err.expect("at least one attempt was made"))
}
