use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sg_core::{GenerationCall, ModelTier, Provider, ResponseFormat, Result, TextGenerationProvider};
use tokio::sync::RwLock;
use tracing::debug;

use super::{error_from_response, resolve_credential};
use crate::Config;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Serialize)]
pub(crate) struct Part {
    pub text: String,
}

#[derive(Serialize)]
pub(crate) struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<Part>,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct Tool {
    google_search: serde_json::Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

#[derive(Deserialize)]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
pub(crate) struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Deserialize)]
pub(crate) struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResponsePart {
    pub text: Option<String>,
    pub inline_data: Option<InlineData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InlineData {
    pub mime_type: Option<String>,
    pub data: String,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// HTTP handle bound to one API key.
pub(crate) struct GeminiClient {
    pub http: Client,
    pub api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: Client::new(),
            api_key,
        }
    }
}

/// Default provider, talking to the `generateContent` REST endpoint.
pub struct GeminiProvider {
    config: Config,
    base_url: String,
    cached: RwLock<Option<Arc<GeminiClient>>>,
}

impl fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiProvider {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            base_url: GEMINI_BASE_URL.to_string(),
            cached: RwLock::new(None),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// A caller credential gets a throwaway client. Otherwise the shared
    /// client is built on first use, once a key can be resolved.
    async fn client(&self, credential: Option<&str>) -> Result<Arc<GeminiClient>> {
        if let Some(key) = credential.map(str::trim).filter(|k| !k.is_empty()) {
            return Ok(Arc::new(GeminiClient::new(key.to_string())));
        }
        if let Some(client) = self.cached.read().await.as_ref() {
            return Ok(client.clone());
        }
        let mut cached = self.cached.write().await;
        if let Some(client) = cached.as_ref() {
            return Ok(client.clone());
        }
        let key = resolve_credential(Provider::Gemini, None, &self.config)?;
        let client = Arc::new(GeminiClient::new(key));
        *cached = Some(client.clone());
        Ok(client)
    }

    pub fn has_cached_client(&self) -> bool {
        self.cached.try_read().map(|c| c.is_some()).unwrap_or(false)
    }
}

#[async_trait]
impl TextGenerationProvider for GeminiProvider {
    fn kind(&self) -> Provider {
        Provider::Gemini
    }

    fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Pro => &self.config.pro_model,
            ModelTier::Flash => &self.config.flash_model,
        }
    }

    async fn generate(&self, call: &GenerationCall<'_>) -> Result<String> {
        let client = self.client(call.credential).await?;
        let model = self.model_for(call.tier);

        let mut generation_config = GenerationConfig {
            temperature: Some(self.config.temperature),
            ..Default::default()
        };
        if let ResponseFormat::Json(schema) = &call.response_format {
            generation_config.response_mime_type = Some("application/json".to_string());
            generation_config.response_schema = Some(schema.clone());
        }

        let system_instruction = if call.system_prompt.trim().is_empty() {
            None
        } else {
            Some(Content {
                role: None,
                parts: vec![Part {
                    text: call.system_prompt.to_string(),
                }],
            })
        };

        let tools = if call.grounded_search {
            vec![Tool {
                google_search: serde_json::json!({}),
            }]
        } else {
            Vec::new()
        };

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: call.user_prompt.to_string(),
                }],
            }],
            system_instruction,
            generation_config,
            tools,
        };

        debug!("Calling Gemini model {}", model);
        let response = client
            .http
            .post(format!("{}/models/{}:generateContent", self.base_url, model))
            .header("x-goog-api-key", &client.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(Provider::Gemini, response).await);
        }

        let body = response.json::<GenerateContentResponse>().await?;
        Ok(body.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::credential_env_vars;
    use sg_core::Error;

    #[test]
    fn test_request_shape() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: "hello".to_string(),
                }],
            }],
            system_instruction: None,
            generation_config: GenerationConfig {
                temperature: Some(0.7),
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(serde_json::json!({"type": "OBJECT"})),
            },
            tools: vec![Tool {
                google_search: serde_json::json!({}),
            }],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(value["generationConfig"]["responseMimeType"], "application/json");
        assert!(value.get("systemInstruction").is_none());
        assert!(value["tools"][0].get("google_search").is_some());
    }

    #[test]
    fn test_response_text_joins_parts() {
        let body: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "a"}, {"text": "b"}]}}]
        }))
        .unwrap();
        assert_eq!(body.text(), "ab");

        let empty: GenerateContentResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(empty.text(), "");
    }

    #[tokio::test]
    async fn test_caller_credential_does_not_touch_cache() {
        let provider = GeminiProvider::new(Config::default());
        let client = provider.client(Some("caller-key")).await.unwrap();
        assert_eq!(client.api_key, "caller-key");
        assert!(!provider.has_cached_client());
    }

    #[tokio::test]
    async fn test_configured_key_is_cached() {
        let config = Config::default().with_api_key(Provider::Gemini, "configured");
        let provider = GeminiProvider::new(config);
        let first = provider.client(None).await.unwrap();
        let second = provider.client(None).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(provider.has_cached_client());
    }

    #[tokio::test]
    async fn test_missing_key_is_not_cached() {
        for name in credential_env_vars(Provider::Gemini) {
            std::env::remove_var(name);
        }
        let provider = GeminiProvider::new(Config::default());
        assert!(matches!(
            provider.client(None).await,
            Err(Error::MissingCredential(Provider::Gemini))
        ));
        assert!(!provider.has_cached_client());

        std::env::set_var("GEMINI_API_KEY", "late-key");
        let client = provider.client(None).await;
        std::env::remove_var("GEMINI_API_KEY");
        assert_eq!(client.unwrap().api_key, "late-key");
        assert!(provider.has_cached_client());
    }

    #[test]
    fn test_model_for_tier() {
        let provider = GeminiProvider::new(Config::default());
        assert_eq!(provider.model_for(ModelTier::Pro), crate::DEFAULT_PRO_MODEL);
        assert_eq!(provider.model_for(ModelTier::Flash), crate::DEFAULT_FLASH_MODEL);
    }
}
