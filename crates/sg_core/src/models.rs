use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Provider;
use crate::Result;

/// Capability tier requested from a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelTier {
    /// Higher capability, longer context.
    Pro,
    /// Faster and cheaper.
    Flash,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseFormat {
    Text,
    /// JSON output constrained by the given schema.
    Json(serde_json::Value),
}

/// A single "system persona + prompt in, text out" call.
#[derive(Debug, Clone)]
pub struct GenerationCall<'a> {
    pub system_prompt: &'a str,
    pub user_prompt: &'a str,
    pub tier: ModelTier,
    pub credential: Option<&'a str>,
    pub response_format: ResponseFormat,
    /// Let the provider ground the answer with web search when it can.
    pub grounded_search: bool,
}

impl<'a> GenerationCall<'a> {
    pub fn new(system_prompt: &'a str, user_prompt: &'a str, tier: ModelTier) -> Self {
        Self {
            system_prompt,
            user_prompt,
            tier,
            credential: None,
            response_format: ResponseFormat::Text,
            grounded_search: false,
        }
    }

    pub fn with_credential(mut self, credential: Option<&'a str>) -> Self {
        self.credential = credential;
        self
    }

    pub fn with_json_schema(mut self, schema: serde_json::Value) -> Self {
        self.response_format = ResponseFormat::Json(schema);
        self
    }

    pub fn with_grounded_search(mut self) -> Self {
        self.grounded_search = true;
        self
    }
}

#[async_trait]
pub trait TextGenerationProvider: Send + Sync + fmt::Debug {
    fn kind(&self) -> Provider;

    /// Model identifier used for `tier`.
    fn model_for(&self, tier: ModelTier) -> &str;

    async fn generate(&self, call: &GenerationCall<'_>) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:3")]
    Standard,
    #[serde(rename = "3:4")]
    Portrait,
    #[serde(rename = "9:16")]
    Tall,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Square => "1:1",
            AspectRatio::Standard => "4:3",
            AspectRatio::Portrait => "3:4",
            AspectRatio::Tall => "9:16",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "16:9" => Ok(AspectRatio::Landscape),
            "1:1" => Ok(AspectRatio::Square),
            "4:3" => Ok(AspectRatio::Standard),
            "3:4" => Ok(AspectRatio::Portrait),
            "9:16" => Ok(AspectRatio::Tall),
            other => Err(format!("Unsupported aspect ratio: {}", other)),
        }
    }
}

/// Media backend: descriptive prompt in, image reference (usually a data URL) out.
#[async_trait]
pub trait ImageGenerator: Send + Sync + fmt::Debug {
    async fn generate_image(&self, prompt: &str, aspect_ratio: AspectRatio) -> Result<String>;
}
