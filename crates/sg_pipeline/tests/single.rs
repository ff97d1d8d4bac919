use std::sync::Arc;

use sg_core::{ArticleStorage, ContentRequest, Provider};
use sg_inference::models::dummy::DummyProvider;
use sg_inference::router::ProviderRouter;
use sg_pipeline::logging::{LogLevel, Logger, MemoryLogSink};
use sg_pipeline::progress::{BatchEvent, BatchStatus, RecordingProgress};
use sg_pipeline::GenerationOrchestrator;
use sg_storage::InMemoryStorage;

const GEMINI_ARTICLE: &str = "```json\n{\"title\": \"best ai tools\", \"slug\": \"best-ai-tools\", \"metaDescription\": \"From the default provider.\"}\n```\n\n# best ai tools\n\nBest ai tools help you work faster.\n\n## why best ai tools matter\n\n### benefits\n\nText with [a link](http://x).\n";

fn request() -> ContentRequest {
    ContentRequest::new("Best AI Tools", "best ai tools").with_secondary_keywords(["ai writing", "seo tools"])
}

#[tokio::test]
async fn test_single_generation_scores_article() {
    let gemini = Arc::new(DummyProvider::always(Provider::Gemini, GEMINI_ARTICLE));
    let storage = Arc::new(InMemoryStorage::new());
    let orchestrator = GenerationOrchestrator::new(
        Arc::new(ProviderRouter::new().with_provider(gemini.clone())),
        storage.clone(),
    );

    let outcome = orchestrator.generate_single(request()).await;

    assert_eq!(outcome.status, BatchStatus::Done);
    let article = &outcome.articles[0];
    assert_eq!(article.metadata.slug, "best-ai-tools");
    assert!(article.body_markdown.starts_with("# best ai tools"));
    assert!(article.score().is_some());
    assert_eq!(article.generated_by, Provider::Gemini);
    assert_eq!(storage.get(&article.id).await.unwrap().unwrap().id, article.id);
}

#[tokio::test]
async fn test_failing_non_default_provider_falls_back_to_default() {
    let gemini = Arc::new(DummyProvider::always(Provider::Gemini, GEMINI_ARTICLE));
    let openai = Arc::new(DummyProvider::failing(Provider::OpenAi, "OpenAI API key is missing"));
    let router = ProviderRouter::new()
        .with_provider(gemini.clone())
        .with_provider(openai.clone());
    let progress = Arc::new(RecordingProgress::new());
    let logs = Arc::new(MemoryLogSink::new());
    let orchestrator = GenerationOrchestrator::new(Arc::new(router), Arc::new(InMemoryStorage::new()))
        .with_progress(progress.clone())
        .with_logger(Logger::new().with_sink(logs.clone()));

    let request = request()
        .with_provider(Provider::OpenAi)
        .with_credential(Some("sk-openai".to_string()));
    let outcome = orchestrator.generate_single(request).await;

    assert!(outcome.is_success());
    let article = &outcome.articles[0];
    assert_eq!(article.generated_by, Provider::Gemini);
    assert_eq!(article.metadata.meta_description, "From the default provider.");
    assert_eq!(openai.call_count(), 1);
    assert_eq!(openai.calls()[0].credential.as_deref(), Some("sk-openai"));
    // the OpenAI key is not handed to the default provider
    assert_eq!(gemini.calls()[0].credential, None);

    assert!(progress
        .events()
        .iter()
        .any(|e| matches!(e, BatchEvent::FellBack { from: Provider::OpenAi, to: Provider::Gemini, .. })));
    assert!(logs
        .texts()
        .iter()
        .any(|t| t.starts_with("[1/1] OpenAI generation failed") && t.ends_with("Falling back to Gemini.")));
}

#[tokio::test]
async fn test_default_provider_failure_propagates_as_failed_batch() {
    let gemini = Arc::new(DummyProvider::failing(Provider::Gemini, "service unavailable"));
    let logs = Arc::new(MemoryLogSink::new());
    let orchestrator = GenerationOrchestrator::new(
        Arc::new(ProviderRouter::new().with_provider(gemini.clone())),
        Arc::new(InMemoryStorage::new()),
    )
    .with_logger(Logger::new().with_sink(logs.clone()));

    let outcome = orchestrator.generate_single(request()).await;

    assert_eq!(outcome.status, BatchStatus::Failed);
    assert!(outcome.articles.is_empty());
    assert!(outcome.error.unwrap().contains("service unavailable"));
    // pillar: Pro attempt plus one Flash retry, nothing more
    assert_eq!(gemini.call_count(), 2);
    assert!(logs.entries().iter().any(|e| e.level == LogLevel::Error));
}

#[tokio::test]
async fn test_failing_default_after_fallback_is_not_chained() {
    let gemini = Arc::new(DummyProvider::failing(Provider::Gemini, "down"));
    let claude = Arc::new(DummyProvider::failing(Provider::Claude, "bad key"));
    let router = ProviderRouter::new().with_provider(gemini.clone()).with_provider(claude.clone());
    let orchestrator = GenerationOrchestrator::new(Arc::new(router), Arc::new(InMemoryStorage::new()));

    let outcome = orchestrator
        .generate_single(request().with_kind(sg_core::ContentKind::Satellite).with_provider(Provider::Claude))
        .await;

    assert_eq!(outcome.status, BatchStatus::Failed);
    assert_eq!(claude.call_count(), 1);
    assert_eq!(gemini.call_count(), 1);
    assert!(outcome.error.unwrap().contains("down"));
}

#[tokio::test]
async fn test_unparseable_metadata_still_yields_article() {
    let gemini = Arc::new(DummyProvider::always(
        Provider::Gemini,
        "```json\n{oops\n```\n# best ai tools\n\nbody",
    ));
    let orchestrator = GenerationOrchestrator::new(
        Arc::new(ProviderRouter::new().with_provider(gemini)),
        Arc::new(InMemoryStorage::new()),
    );
    let outcome = orchestrator.generate_single(request()).await;

    assert!(outcome.is_success());
    let article = &outcome.articles[0];
    assert_eq!(article.metadata.title, "Best AI Tools");
    assert_eq!(article.metadata.slug, "best-ai-tools");
    assert!(article.body_markdown.starts_with("```json"));
}
