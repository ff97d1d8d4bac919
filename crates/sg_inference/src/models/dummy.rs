use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use sg_core::{
    AspectRatio, Error, GenerationCall, ImageGenerator, ModelTier, Provider, ResponseFormat, Result,
    TextGenerationProvider,
};

/// Article returned by [`DummyProvider::canned`].
pub const CANNED_ARTICLE: &str = "```json\n{\n  \"title\": \"offline draft\",\n  \"slug\": \"offline-draft\",\n  \"metaDescription\": \"An offline draft produced without a provider.\"\n}\n```\n\n# offline draft\n\n![COVER: offline draft](https://placehold.co/1200x600/EEE/31343C?text=COVER)\n\nThis offline draft stands in for a real article.\n\n## why an offline draft helps\n\n### quick checks\n\nSee the [Internal Link](#) for more.\n";

/// Cluster plan returned by [`DummyProvider::canned`] for object-shaped JSON calls.
pub const CANNED_PLAN: &str = r#"{"pillar": {"title": "offline pillar", "mainKeyword": "offline pillar"}, "satellites": [{"title": "offline satellite 1", "mainKeyword": "offline satellite 1"}, {"title": "offline satellite 2", "mainKeyword": "offline satellite 2"}, {"title": "offline satellite 3", "mainKeyword": "offline satellite 3"}, {"title": "offline satellite 4", "mainKeyword": "offline satellite 4"}, {"title": "offline satellite 5", "mainKeyword": "offline satellite 5"}, {"title": "offline satellite 6", "mainKeyword": "offline satellite 6"}]}"#;

/// Topic ideas returned by [`DummyProvider::canned`] for array-shaped JSON calls.
pub const CANNED_TOPICS: &str = r#"[{"topic": "offline topic 1", "score": 90}, {"topic": "offline topic 2", "score": 80}, {"topic": "offline topic 3", "score": 70}, {"topic": "offline topic 4", "score": 60}]"#;

/// Keyword research returned by [`DummyProvider::canned`] for grounded calls.
pub const CANNED_RESEARCH: &str = r#"{"mainKeyword": "offline keyword", "audience": "offline readers", "secondaryKeywords": ["offline one", "offline two", "offline three"]}"#;

#[derive(Debug, Clone)]
pub enum DummyReply {
    Text(String),
    Fail(String),
}

/// What a [`DummyProvider`] was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub system_prompt: String,
    pub user_prompt: String,
    pub tier: ModelTier,
    pub credential: Option<String>,
    pub json: bool,
    pub grounded_search: bool,
}

/// Scripted provider. Replies are consumed in order; once the script is
/// exhausted every call gets the fallback reply.
pub struct DummyProvider {
    kind: Provider,
    script: Mutex<VecDeque<DummyReply>>,
    fallback: DummyReply,
    canned: bool,
    calls: Mutex<Vec<RecordedCall>>,
}

impl fmt::Debug for DummyProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyProvider")
            .field("kind", &self.kind)
            .finish()
    }
}

impl DummyProvider {
    pub fn new(kind: Provider, fallback: DummyReply) -> Self {
        Self {
            kind,
            script: Mutex::new(VecDeque::new()),
            fallback,
            canned: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn always(kind: Provider, text: impl Into<String>) -> Self {
        Self::new(kind, DummyReply::Text(text.into()))
    }

    pub fn failing(kind: Provider, message: impl Into<String>) -> Self {
        Self::new(kind, DummyReply::Fail(message.into()))
    }

    /// Offline stand-in. Answers by call shape: [`CANNED_PLAN`] or
    /// [`CANNED_TOPICS`] for JSON calls, [`CANNED_RESEARCH`] for grounded
    /// calls and [`CANNED_ARTICLE`] for everything else.
    pub fn canned(kind: Provider) -> Self {
        Self {
            canned: true,
            ..Self::always(kind, CANNED_ARTICLE)
        }
    }

    pub fn then_reply(self, text: impl Into<String>) -> Self {
        self.push(DummyReply::Text(text.into()));
        self
    }

    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.push(DummyReply::Fail(message.into()));
        self
    }

    pub fn push(&self, reply: DummyReply) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(reply);
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    fn next_reply(&self, call: &GenerationCall<'_>) -> DummyReply {
        self.script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front())
            .unwrap_or_else(|| {
                if self.canned {
                    DummyReply::Text(canned_reply(call).to_string())
                } else {
                    self.fallback.clone()
                }
            })
    }
}

fn canned_reply(call: &GenerationCall<'_>) -> &'static str {
    match &call.response_format {
        ResponseFormat::Json(schema) if schema["type"] == "ARRAY" => CANNED_TOPICS,
        ResponseFormat::Json(_) => CANNED_PLAN,
        ResponseFormat::Text if call.grounded_search => CANNED_RESEARCH,
        ResponseFormat::Text => CANNED_ARTICLE,
    }
}

#[async_trait]
impl TextGenerationProvider for DummyProvider {
    fn kind(&self) -> Provider {
        self.kind
    }

    fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Pro => "dummy-pro",
            ModelTier::Flash => "dummy-flash",
        }
    }

    async fn generate(&self, call: &GenerationCall<'_>) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                system_prompt: call.system_prompt.to_string(),
                user_prompt: call.user_prompt.to_string(),
                tier: call.tier,
                credential: call.credential.map(str::to_string),
                json: matches!(call.response_format, ResponseFormat::Json(_)),
                grounded_search: call.grounded_search,
            });
        }
        match self.next_reply(call) {
            DummyReply::Text(text) => Ok(text),
            DummyReply::Fail(message) => Err(Error::provider(self.kind, message)),
        }
    }
}

/// Image backend returning a tiny data URL, failing for prompts that
/// contain any of the configured markers.
#[derive(Debug, Default)]
pub struct DummyImageGenerator {
    fail_markers: Vec<String>,
    calls: AtomicUsize,
}

impl DummyImageGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, marker: impl Into<String>) -> Self {
        self.fail_markers.push(marker.into());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageGenerator for DummyImageGenerator {
    async fn generate_image(&self, prompt: &str, aspect_ratio: AspectRatio) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_markers.iter().any(|m| prompt.contains(m.as_str())) {
            return Err(Error::ImageGeneration(format!("refused prompt: {}", prompt)));
        }
        Ok(format!("data:image/png;base64,ZHVtbXk{}{}", n, aspect_ratio.as_str().replace(':', "x")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_then_fallback() {
        let provider = DummyProvider::always(Provider::Gemini, "fallback")
            .then_fail("boom")
            .then_reply("second");
        let call = GenerationCall::new("s", "u", ModelTier::Pro);

        assert!(provider.generate(&call).await.is_err());
        assert_eq!(provider.generate(&call).await.unwrap(), "second");
        assert_eq!(provider.generate(&call).await.unwrap(), "fallback");
        assert_eq!(provider.call_count(), 3);
        assert_eq!(provider.calls()[0].tier, ModelTier::Pro);
    }

    #[tokio::test]
    async fn test_records_credential() {
        let provider = DummyProvider::canned(Provider::OpenAi);
        let call = GenerationCall::new("s", "u", ModelTier::Flash).with_credential(Some("key"));
        provider.generate(&call).await.unwrap();
        assert_eq!(provider.calls()[0].credential.as_deref(), Some("key"));
    }

    #[tokio::test]
    async fn test_canned_answers_by_call_shape() {
        let provider = DummyProvider::canned(Provider::Gemini);
        let plan = GenerationCall::new("", "plan", ModelTier::Flash).with_json_schema(serde_json::json!({"type": "OBJECT"}));
        let topics = GenerationCall::new("", "ideas", ModelTier::Flash).with_json_schema(serde_json::json!({"type": "ARRAY"}));
        let research = GenerationCall::new("", "research", ModelTier::Flash).with_grounded_search();
        let article = GenerationCall::new("s", "write", ModelTier::Pro);

        assert_eq!(provider.generate(&plan).await.unwrap(), CANNED_PLAN);
        assert_eq!(provider.generate(&topics).await.unwrap(), CANNED_TOPICS);
        assert_eq!(provider.generate(&research).await.unwrap(), CANNED_RESEARCH);
        assert_eq!(provider.generate(&article).await.unwrap(), CANNED_ARTICLE);
    }

    #[tokio::test]
    async fn test_image_generator_markers() {
        let images = DummyImageGenerator::new().failing_on("broken");
        assert!(images
            .generate_image("fine", AspectRatio::Landscape)
            .await
            .unwrap()
            .starts_with("data:image/png;base64,"));
        assert!(images.generate_image("a broken one", AspectRatio::Square).await.is_err());
        assert_eq!(images.call_count(), 2);
    }
}
