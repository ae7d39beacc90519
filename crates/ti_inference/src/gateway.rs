use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ti_core::{Error, Result, TextGenerator};
use tracing::debug;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    #[serde(rename = "responseSchema", skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Gemini `generateContent` client. All transport, HTTP-status, and
/// response-shape failures come back as `Error::Inference` so callers can
/// retry uniformly.
pub struct GeminiClient {
    client: Arc<Client>,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Result<Self> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Config("GEMINI_API_KEY is not set".to_string()))?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Inference(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client: Arc::new(client),
            api_key,
            model: model.into(),
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    async fn call(&self, request: &GenerateRequest) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Inference(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Inference(format!(
                "api returned {status}: {}",
                body.chars().take(500).collect::<String>()
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("malformed response body: {e}")))?;

        let text = parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Inference("response contained no candidate text".to_string()))?;

        debug!(model = %self.model, chars = text.len(), "generation completed");
        Ok(text)
    }
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: None,
        };
        self.call(&request).await
    }

    async fn generate_structured(&self, prompt: &str, schema: &Value) -> Result<Value> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: Some(schema.clone()),
            }),
        };
        let text = self.call(&request).await?;
        serde_json::from_str(&text)
            .map_err(|e| Error::Inference(format!("structured response is not valid json: {e}")))
    }
}

/// Stand-in for a missing API key: the rest of the service keeps running and
/// every generation call reports the absent credential instead.
pub struct DisabledGenerator;

#[async_trait]
impl TextGenerator for DisabledGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(Error::Inference(
            "GEMINI_API_KEY is not set, generation is disabled".to_string(),
        ))
    }

    async fn generate_structured(&self, _prompt: &str, _schema: &Value) -> Result<Value> {
        Err(Error::Inference(
            "GEMINI_API_KEY is not set, generation is disabled".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn disabled_generator_reports_the_missing_credential() {
        let err = DisabledGenerator.generate("질문").await.unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
        let err = DisabledGenerator
            .generate_structured("질문", &json!({"type": "ARRAY"}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
    }

    #[test]
    fn missing_key_is_a_config_error() {
        assert!(matches!(
            GeminiClient::new(None, "gemini-2.5-flash"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            GeminiClient::new(Some("  ".to_string()), "gemini-2.5-flash"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn request_serializes_camel_case_generation_config() {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: "hi".to_string(),
                }],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: Some(json!({"type": "ARRAY"})),
            }),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(value["generationConfig"]["responseSchema"]["type"], "ARRAY");
    }

    #[test]
    fn plain_request_omits_generation_config() {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: "hi".to_string(),
                }],
            }],
            generation_config: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("generationConfig").is_none());
    }

    #[test]
    fn response_text_extraction() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":" 요약 결과 "}]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(body).unwrap();
        let text = parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.trim().to_string())
            .unwrap();
        assert_eq!(text, "요약 결과");
    }
}
