use std::sync::Arc;

use reqwest::Response;
use serde::Deserialize;
use sg_core::{Error, Provider, Result, TextGenerationProvider};

use crate::Config;

pub mod claude;
pub mod dummy;
pub mod gemini;
pub mod image;
pub mod openai;

pub use claude::ClaudeProvider;
pub use dummy::{DummyImageGenerator, DummyProvider};
pub use gemini::GeminiProvider;
pub use image::GeminiImageGenerator;
pub use openai::OpenAiProvider;

/// Environment variables consulted for a provider key, in order.
pub fn credential_env_vars(provider: Provider) -> &'static [&'static str] {
    match provider {
        Provider::Gemini => &["GEMINI_API_KEY", "API_KEY"],
        Provider::OpenAi => &["OPENAI_API_KEY"],
        Provider::Claude => &["ANTHROPIC_API_KEY", "CLAUDE_API_KEY"],
    }
}

pub fn env_credential(provider: Provider) -> Option<String> {
    credential_env_vars(provider)
        .iter()
        .find_map(|name| crate::non_blank_env(name))
        .filter(|key| !is_placeholder_key(key))
}

// Sample keys shipped in env templates look like "YOUR_OPENAI_KEY".
fn is_placeholder_key(key: &str) -> bool {
    key.trim().to_ascii_uppercase().starts_with("YOUR_")
}

/// Caller credential, then the configured key, then the environment.
pub fn resolve_credential(
    provider: Provider,
    caller: Option<&str>,
    config: &Config,
) -> Result<String> {
    caller
        .map(str::trim)
        .filter(|k| !k.is_empty() && !is_placeholder_key(k))
        .map(str::to_string)
        .or_else(|| {
            config
                .configured_key(provider)
                .filter(|k| !is_placeholder_key(k))
                .map(str::to_string)
        })
        .or_else(|| env_credential(provider))
        .ok_or(Error::MissingCredential(provider))
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Turns a non-success HTTP response into a provider error, preferring the
/// API's own `error.message` over the status text.
pub(crate) async fn error_from_response(provider: Provider, response: Response) -> Error {
    let status = response.status();
    let fallback = status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.to_string());
    let message = response
        .json::<ErrorEnvelope>()
        .await
        .ok()
        .and_then(|envelope| envelope.error)
        .and_then(|body| body.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or(fallback);
    Error::provider(provider, message)
}

pub fn create_provider(kind: Provider, config: &Config) -> Arc<dyn TextGenerationProvider> {
    match kind {
        Provider::Gemini => Arc::new(GeminiProvider::new(config.clone())),
        Provider::OpenAi => Arc::new(OpenAiProvider::new(config.clone())),
        Provider::Claude => Arc::new(ClaudeProvider::new(config.clone())),
    }
}
