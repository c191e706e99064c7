//! Gemini REST client.
//!
//! Documents are sent inline (base64) with the prompt to the
//! `models/{model}:generateContent` endpoint. When a model is missing or
//! overloaded the next model in the configured chain is tried.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::AiError;
use crate::models::AiConfig;

use super::VisionModel;

/// Gemini generative model client.
pub struct GeminiClient {
    http_client: Client,
    base_url: String,
    api_key: String,
    models: Vec<String>,
}

impl GeminiClient {
    /// Create a client with an explicit key and model chain.
    pub fn new(base_url: &str, api_key: impl Into<String>, models: Vec<String>) -> Result<Self, AiError> {
        Self::build(base_url, api_key.into(), models, Duration::from_secs(120))
    }

    /// Create a client from configuration, reading the key from the environment.
    ///
    /// Returns `None` when AI is disabled or no key is set; the caller then
    /// runs without the model.
    pub fn from_config(config: &AiConfig) -> Option<Self> {
        if !config.enabled {
            debug!("AI extraction disabled in configuration");
            return None;
        }

        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        let Some(api_key) = api_key else {
            info!("{} not set, AI extraction unavailable", config.api_key_env);
            return None;
        };

        match Self::build(
            &config.base_url,
            api_key,
            config.model_chain(),
            Duration::from_secs(config.timeout_secs),
        ) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!("Failed to initialize Gemini client: {}", e);
                None
            }
        }
    }

    fn build(base_url: &str, api_key: String, models: Vec<String>, timeout: Duration) -> Result<Self, AiError> {
        if models.is_empty() {
            return Err(AiError::NotConfigured("no model configured".to_string()));
        }
        let http_client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            models,
        })
    }

    /// Models tried, in order.
    pub fn models(&self) -> &[String] {
        &self.models
    }

    async fn generate_with(&self, model: &str, request: &GenerateRequest) -> Result<String, AiError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);
        debug!("POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                status: status.as_u16(),
                message: message.chars().take(500).collect(),
            });
        }

        let body: GenerateResponse = response.json().await?;
        body.text().ok_or(AiError::EmptyReply)
    }
}

#[async_trait]
impl VisionModel for GeminiClient {
    async fn generate(&self, prompt: &str, data: &[u8], mime_type: &str) -> Result<String, AiError> {
        let request = GenerateRequest::new(prompt, data, mime_type);
        first_available(&self.models, |model| self.generate_with(model, &request)).await
    }

    fn model_id(&self) -> &str {
        &self.models[0]
    }
}

/// Call each model in turn until one is available.
///
/// Only "model unavailable" answers move on to the next model; any other
/// error is returned immediately.
pub(crate) async fn first_available<'a, F, Fut>(models: &'a [String], mut call: F) -> Result<String, AiError>
where
    F: FnMut(&'a str) -> Fut,
    Fut: Future<Output = Result<String, AiError>>,
{
    for model in models {
        match call(model).await {
            Ok(reply) => {
                debug!("Model {} answered ({} chars)", model, reply.len());
                return Ok(reply);
            }
            Err(e) if e.is_model_unavailable() => {
                warn!("Model {} unavailable, trying next: {}", model, e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(AiError::AllModelsFailed(models.join(", ")))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

impl GenerateRequest {
    fn new(prompt: &str, data: &[u8], mime_type: &str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: prompt.to_string(),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: mime_type.to_string(),
                            data: base64::engine::general_purpose::STANDARD.encode(data),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig { temperature: 0.1 },
        }
    }
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Debug, Deserialize)]
struct ReplyPart {
    text: Option<String>,
}

impl GenerateResponse {
    fn text(&self) -> Option<String> {
        let text: String = self
            .candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    fn chain() -> Vec<String> {
        vec!["primary".to_string(), "second".to_string(), "third".to_string()]
    }

    fn unavailable() -> AiError {
        AiError::Api {
            status: 404,
            message: "model not found".to_string(),
        }
    }

    #[tokio::test]
    async fn test_falls_back_to_next_model() {
        let models = chain();
        let tried = RefCell::new(Vec::new());
        let reply = first_available(&models, |model| {
            tried.borrow_mut().push(model.to_string());
            async move {
                if model == "third" {
                    Ok("{}".to_string())
                } else {
                    Err(unavailable())
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(reply, "{}");
        assert_eq!(*tried.borrow(), chain());
    }

    #[tokio::test]
    async fn test_stops_on_other_errors() {
        let models = chain();
        let tried = RefCell::new(0);
        let result = first_available(&models, |_| {
            *tried.borrow_mut() += 1;
            async {
                Err(AiError::Api {
                    status: 403,
                    message: "API key not valid".to_string(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(AiError::Api { status: 403, .. })));
        assert_eq!(*tried.borrow(), 1);
    }

    #[tokio::test]
    async fn test_all_models_unavailable() {
        let models = chain();
        let result = first_available(&models, |_| async { Err(unavailable()) }).await;
        assert!(matches!(result, Err(AiError::AllModelsFailed(_))));
    }

    #[test]
    fn test_missing_key_means_unavailable() {
        let config = AiConfig {
            api_key_env: "COSTSCAN_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..Default::default()
        };
        assert!(GeminiClient::from_config(&config).is_none());

        let disabled = AiConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(GeminiClient::from_config(&disabled).is_none());
    }

    #[test]
    fn test_request_shape() {
        let request = GenerateRequest::new("extract", b"abc", "image/png");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["contents"][0]["parts"][0]["text"], "extract");
        assert_eq!(json["contents"][0]["parts"][1]["inline_data"]["mime_type"], "image/png");
        assert_eq!(json["contents"][0]["parts"][1]["inline_data"]["data"], "YWJj");
        assert!(json["generationConfig"]["temperature"].is_number());
    }

    #[test]
    fn test_response_text() {
        let body: GenerateResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "{\"a\":"}, {"text": "1}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(body.text().as_deref(), Some("{\"a\":1}"));

        let empty: GenerateResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert_eq!(empty.text(), None);
    }
}
