use thiserror::Error;

use crate::types::Provider;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0} API key is missing")]
    MissingCredential(Provider),

    #[error("{provider} request failed: {message}")]
    Provider { provider: Provider, message: String },

    #[error("No content generated from provider {0}")]
    EmptyResponse(Provider),

    #[error("Planning error: {0}")]
    Planning(String),

    #[error("Invalid edit: {0}")]
    InvalidEdit(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Image generation error: {0}")]
    ImageGeneration(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl Error {
    pub fn provider(provider: Provider, message: impl Into<String>) -> Self {
        Self::Provider {
            provider,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
