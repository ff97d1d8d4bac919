use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sg_core::{AspectRatio, Error, ImageGenerator, Provider, Result};
use tracing::{info, warn};

use super::gemini::{Content, GenerateContentResponse, Part, GEMINI_BASE_URL};
use super::{error_from_response, resolve_credential};
use crate::Config;

/// How a model in the chain is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageEndpoint {
    /// Imagen `:predict`.
    Predict,
    /// Native image output from `:generateContent`.
    GenerateContent,
}

impl ImageEndpoint {
    pub fn for_model(model: &str) -> Self {
        if model.starts_with("imagen") {
            ImageEndpoint::Predict
        } else {
            ImageEndpoint::GenerateContent
        }
    }
}

#[derive(Serialize)]
struct PredictInstance {
    prompt: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    sample_count: u32,
    aspect_ratio: String,
    output_mime_type: String,
}

#[derive(Serialize)]
struct PredictRequest {
    instances: Vec<PredictInstance>,
    parameters: PredictParameters,
}

#[derive(Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    aspect_ratio: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageGenerationConfig {
    response_modalities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<ImageConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageContentRequest {
    contents: Vec<Content>,
    generation_config: ImageGenerationConfig,
}

fn data_url(mime_type: Option<&str>, data: &str) -> String {
    format!("data:{};base64,{}", mime_type.unwrap_or("image/png"), data)
}

/// Tries each configured model in order and returns the first image.
pub struct GeminiImageGenerator {
    client: Client,
    config: Config,
    base_url: String,
}

impl fmt::Debug for GeminiImageGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiImageGenerator")
            .field("models", &self.config.image_models)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiImageGenerator {
    pub fn new(config: Config) -> Self {
        Self {
            client: Client::new(),
            config,
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    async fn predict(
        &self,
        api_key: &str,
        model: &str,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<Option<String>> {
        let request = PredictRequest {
            instances: vec![PredictInstance {
                prompt: prompt.to_string(),
            }],
            parameters: PredictParameters {
                sample_count: 1,
                aspect_ratio: aspect_ratio.to_string(),
                output_mime_type: "image/jpeg".to_string(),
            },
        };
        let response = self
            .client
            .post(format!("{}/models/{}:predict", self.base_url, model))
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(Provider::Gemini, response).await);
        }
        let body = response.json::<PredictResponse>().await?;
        Ok(body.predictions.into_iter().find_map(|p| {
            p.bytes_base64_encoded
                .map(|data| data_url(Some(p.mime_type.as_deref().unwrap_or("image/jpeg")), &data))
        }))
    }

    async fn generate_content(
        &self,
        api_key: &str,
        model: &str,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<Option<String>> {
        // flash image models ignore imageConfig and need an explicit ask
        let (text, image_config) = if model.contains("flash") {
            (format!("Generate a photorealistic image of: {}", prompt), None)
        } else {
            (
                prompt.to_string(),
                Some(ImageConfig {
                    aspect_ratio: aspect_ratio.to_string(),
                }),
            )
        };
        let request = ImageContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text }],
            }],
            generation_config: ImageGenerationConfig {
                response_modalities: vec!["IMAGE".to_string()],
                image_config,
            },
        };
        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, model))
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(Provider::Gemini, response).await);
        }
        let body = response.json::<GenerateContentResponse>().await?;
        Ok(body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|content| {
                content
                    .parts
                    .into_iter()
                    .find_map(|part| part.inline_data)
            })
            .map(|inline| data_url(inline.mime_type.as_deref(), &inline.data)))
    }
}

#[async_trait]
impl ImageGenerator for GeminiImageGenerator {
    async fn generate_image(&self, prompt: &str, aspect_ratio: AspectRatio) -> Result<String> {
        let api_key = resolve_credential(Provider::Gemini, None, &self.config)?;
        let mut last_error = None;

        for model in &self.config.image_models {
            info!("Attempting image generation with model: {}", model);
            let attempt = match ImageEndpoint::for_model(model) {
                ImageEndpoint::Predict => self.predict(&api_key, model, prompt, aspect_ratio).await,
                ImageEndpoint::GenerateContent => {
                    self.generate_content(&api_key, model, prompt, aspect_ratio).await
                }
            };
            match attempt {
                Ok(Some(url)) => return Ok(url),
                Ok(None) => warn!("Model {} returned no image data", model),
                Err(e) => {
                    warn!("Image model {} failed: {}", model, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::ImageGeneration("Image generation failed on all models.".to_string())
        }))
    }
}
