use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sg_core::{GenerationCall, ModelTier, Provider, Result, TextGenerationProvider};
use tracing::debug;

use super::{error_from_response, resolve_credential};
use crate::Config;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct MessageParam {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<MessageParam>,
    temperature: f32,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

/// Messages API adapter.
pub struct ClaudeProvider {
    client: Arc<Client>,
    config: Config,
    base_url: String,
}

impl ClaudeProvider {
    pub fn new(config: Config) -> Self {
        Self {
            client: Arc::new(Client::new()),
            config,
            base_url: "https://api.anthropic.com/v1".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_request(&self, call: &GenerationCall<'_>) -> MessagesRequest {
        MessagesRequest {
            model: self.model_for(call.tier).to_string(),
            max_tokens: self.config.claude_max_tokens,
            system: call.system_prompt.to_string(),
            messages: vec![MessageParam {
                role: "user".to_string(),
                content: call.user_prompt.to_string(),
            }],
            temperature: self.config.temperature,
        }
    }
}

impl fmt::Debug for ClaudeProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaudeProvider")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl TextGenerationProvider for ClaudeProvider {
    fn kind(&self) -> Provider {
        Provider::Claude
    }

    fn model_for(&self, _tier: ModelTier) -> &str {
        &self.config.claude_model
    }

    async fn generate(&self, call: &GenerationCall<'_>) -> Result<String> {
        let api_key = resolve_credential(Provider::Claude, call.credential, &self.config)?;
        let request = self.build_request(call);

        debug!("Calling Claude model {}", request.model);
        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(Provider::Claude, response).await);
        }

        let response = response.json::<MessagesResponse>().await?;
        Ok(response
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .unwrap_or_default())
    }
}
