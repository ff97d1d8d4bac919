use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use sg_core::{
    ContentKind, ContentRequest, Error, GenerationCall, ModelTier, Provider, Result,
    TextGenerationProvider,
};
use tracing::{info, warn};

use crate::models::create_provider;
use crate::models::dummy::DummyProvider;
use crate::prompt::SYSTEM_PERSONA;
use crate::Config;

/// Maps each [`Provider`] to its adapter.
///
/// The router is strict: a failing non-default provider surfaces its error.
/// Falling back to the default provider is the orchestrator's job.
#[derive(Clone, Default)]
pub struct ProviderRouter {
    providers: HashMap<Provider, Arc<dyn TextGenerationProvider>>,
}

impl fmt::Debug for ProviderRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&Provider> = self.providers.keys().collect();
        kinds.sort_by_key(|k| k.name());
        f.debug_struct("ProviderRouter").field("providers", &kinds).finish()
    }
}

impl ProviderRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Router wired to the real HTTP adapters.
    pub fn from_config(config: &Config) -> Self {
        [Provider::Gemini, Provider::OpenAi, Provider::Claude]
            .into_iter()
            .fold(Self::new(), |router, kind| {
                router.with_provider(create_provider(kind, config))
            })
    }

    /// Router where every provider answers with canned output, for runs
    /// without credentials.
    pub fn offline() -> Self {
        [Provider::Gemini, Provider::OpenAi, Provider::Claude]
            .into_iter()
            .fold(Self::new(), |router, kind| {
                router.with_provider(Arc::new(DummyProvider::canned(kind)))
            })
    }

    /// Registers `provider` under its own kind, replacing any previous one.
    pub fn with_provider(mut self, provider: Arc<dyn TextGenerationProvider>) -> Self {
        self.register(provider);
        self
    }

    pub fn register(&mut self, provider: Arc<dyn TextGenerationProvider>) {
        self.providers.insert(provider.kind(), provider);
    }

    pub fn provider(&self, kind: Provider) -> Result<Arc<dyn TextGenerationProvider>> {
        self.providers
            .get(&kind)
            .cloned()
            .ok_or_else(|| Error::provider(kind, "no adapter registered"))
    }

    /// Pillars need the long-context model, everything else the fast one.
    pub fn tier_for(kind: ContentKind) -> ModelTier {
        match kind {
            ContentKind::Pillar => ModelTier::Pro,
            ContentKind::Satellite => ModelTier::Flash,
        }
    }

    /// One call against one provider. Empty output is a failure.
    pub async fn call(&self, kind: Provider, call: &GenerationCall<'_>) -> Result<String> {
        let provider = self.provider(kind)?;
        let text = provider.generate(call).await?;
        if text.trim().is_empty() {
            return Err(Error::EmptyResponse(kind));
        }
        Ok(text)
    }

    /// Calls the default provider, degrading from Pro to Flash once.
    pub async fn call_default(&self, call: &GenerationCall<'_>) -> Result<String> {
        let default = Provider::default();
        match self.call(default, call).await {
            Err(e) if call.tier == ModelTier::Pro => {
                warn!("{} Pro model failed ({}), retrying with Flash", default, e);
                let retry = GenerationCall {
                    tier: ModelTier::Flash,
                    ..call.clone()
                };
                self.call(default, &retry).await
            }
            result => result,
        }
    }

    /// Generates article text with the provider the request names.
    pub async fn generate(&self, prompt: &str, request: &ContentRequest) -> Result<String> {
        let call = GenerationCall::new(SYSTEM_PERSONA, prompt, Self::tier_for(request.kind))
            .with_credential(request.credential.as_deref());
        info!("Generating with {}...", request.provider);
        if request.provider.is_default() {
            self.call_default(&call).await
        } else {
            self.call(request.provider, &call).await
        }
    }

    /// Generates article text with the default provider, ignoring the
    /// request's provider and its credential (which belongs to that provider).
    pub async fn generate_default(&self, prompt: &str, request: &ContentRequest) -> Result<String> {
        let credential = if request.provider.is_default() {
            request.credential.as_deref()
        } else {
            None
        };
        let call = GenerationCall::new(SYSTEM_PERSONA, prompt, Self::tier_for(request.kind))
            .with_credential(credential);
        info!("Generating with {}...", Provider::default());
        self.call_default(&call).await
    }
}
