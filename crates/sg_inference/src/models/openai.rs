use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sg_core::{GenerationCall, ModelTier, Provider, ResponseFormat, Result, TextGenerationProvider};
use tracing::debug;

use super::{error_from_response, resolve_credential};
use crate::Config;

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormatSpec {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormatSpec>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

/// Chat-completions adapter.
pub struct OpenAiProvider {
    client: Arc<Client>,
    config: Config,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(config: Config) -> Self {
        Self {
            client: Arc::new(Client::new()),
            config,
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_request(&self, call: &GenerationCall<'_>) -> ChatRequest {
        let response_format = match call.response_format {
            ResponseFormat::Json(_) => Some(ResponseFormatSpec {
                kind: "json_object".to_string(),
            }),
            ResponseFormat::Text => None,
        };
        ChatRequest {
            model: self.model_for(call.tier).to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: call.system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: call.user_prompt.to_string(),
                },
            ],
            temperature: self.config.temperature,
            response_format,
        }
    }
}

impl fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl TextGenerationProvider for OpenAiProvider {
    fn kind(&self) -> Provider {
        Provider::OpenAi
    }

    fn model_for(&self, _tier: ModelTier) -> &str {
        &self.config.openai_model
    }

    async fn generate(&self, call: &GenerationCall<'_>) -> Result<String> {
        // fail fast, before any network traffic
        let api_key = resolve_credential(Provider::OpenAi, call.credential, &self.config)?;
        let request = self.build_request(call);

        debug!("Calling OpenAI model {}", request.model);
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(Provider::OpenAi, response).await);
        }

        let response = response.json::<ChatResponse>().await?;
        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}
