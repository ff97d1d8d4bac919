use std::env;
use std::fmt;

pub mod cluster;
pub mod models;
pub mod parser;
pub mod prompt;
pub mod research;
pub mod router;

pub const DEFAULT_PRO_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_FLASH_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
pub const DEFAULT_CLAUDE_MODEL: &str = "claude-3-5-sonnet-20240620";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_CLAUDE_MAX_TOKENS: u32 = 8192;

/// Image models tried in order until one returns data.
pub const DEFAULT_IMAGE_MODELS: &[&str] = &[
    "imagen-3.0-generate-001",
    "gemini-3-pro-image-preview",
    "gemini-2.5-flash-image",
    "imagen-4.0-generate-001",
];

#[derive(Clone)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub claude_api_key: Option<String>,
    pub pro_model: String,
    pub flash_model: String,
    pub openai_model: String,
    pub claude_model: String,
    pub image_models: Vec<String>,
    pub temperature: f32,
    pub claude_max_tokens: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            openai_api_key: None,
            claude_api_key: None,
            pro_model: DEFAULT_PRO_MODEL.to_string(),
            flash_model: DEFAULT_FLASH_MODEL.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            claude_model: DEFAULT_CLAUDE_MODEL.to_string(),
            image_models: DEFAULT_IMAGE_MODELS.iter().map(|m| m.to_string()).collect(),
            temperature: DEFAULT_TEMPERATURE,
            claude_max_tokens: DEFAULT_CLAUDE_MAX_TOKENS,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "<redacted>");
        f.debug_struct("Config")
            .field("gemini_api_key", &redact(&self.gemini_api_key))
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("claude_api_key", &redact(&self.claude_api_key))
            .field("pro_model", &self.pro_model)
            .field("flash_model", &self.flash_model)
            .field("openai_model", &self.openai_model)
            .field("claude_model", &self.claude_model)
            .field("image_models", &self.image_models)
            .field("temperature", &self.temperature)
            .field("claude_max_tokens", &self.claude_max_tokens)
            .finish()
    }
}

impl Config {
    /// Reads keys and model overrides from the environment.
    pub fn from_env() -> Self {
        let mut config = Self {
            gemini_api_key: models::env_credential(sg_core::Provider::Gemini),
            openai_api_key: models::env_credential(sg_core::Provider::OpenAi),
            claude_api_key: models::env_credential(sg_core::Provider::Claude),
            ..Self::default()
        };
        if let Some(model) = non_blank_env("SG_PRO_MODEL") {
            config.pro_model = model;
        }
        if let Some(model) = non_blank_env("SG_FLASH_MODEL") {
            config.flash_model = model;
        }
        config
    }

    pub fn configured_key(&self, provider: sg_core::Provider) -> Option<&str> {
        let key = match provider {
            sg_core::Provider::Gemini => self.gemini_api_key.as_deref(),
            sg_core::Provider::OpenAi => self.openai_api_key.as_deref(),
            sg_core::Provider::Claude => self.claude_api_key.as_deref(),
        };
        key.filter(|k| !k.trim().is_empty())
    }

    pub fn with_api_key(mut self, provider: sg_core::Provider, key: impl Into<String>) -> Self {
        let key = Some(key.into());
        match provider {
            sg_core::Provider::Gemini => self.gemini_api_key = key,
            sg_core::Provider::OpenAi => self.openai_api_key = key,
            sg_core::Provider::Claude => self.claude_api_key = key,
        }
        self
    }
}

pub(crate) fn non_blank_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

pub mod prelude {
    pub use super::cluster::ClusterPlanner;
    pub use super::models::create_provider;
    pub use super::parser::parse_response;
    pub use super::prompt::build_prompt;
    pub use super::router::ProviderRouter;
    pub use super::Config;
    pub use sg_core::{Article, ContentRequest, Error, Provider, Result};
}

pub use models::create_provider;
pub use router::ProviderRouter;
