use async_trait::async_trait;
use serde_json::Value;

use crate::Result;

/// The seam to the LLM service. Implementations normalize every failure
/// (missing credential, transport, bad status, malformed payload) into an
/// `Err`; no panic crosses this boundary.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Single-turn free-text completion.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Single-turn completion constrained to `schema`; the structured payload
    /// is parsed before being returned.
    async fn generate_structured(&self, prompt: &str, schema: &Value) -> Result<Value>;
}
