use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use sg_core::revision;
use sg_core::{Article, ChatRole, Error, GenerationCall, ModelTier, Result};
use sg_inference::prompt::{refine_prompt, review_prompt, rewrite_prompt, REVIEWER_PERSONA, SYSTEM_PERSONA};
use sg_inference::router::ProviderRouter;

use crate::logging::Logger;

pub const ASSISTANT_UPDATED: &str = "I've updated the article based on your request.";
pub const ASSISTANT_FAILED: &str = "Sorry, I encountered an error while processing your request.";
pub const NO_REVIEW: &str = "No review generated.";

#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub article: Article,
    /// Whether the model's revision replaced the body.
    pub applied: bool,
}

/// AI-assisted edits of an existing article, all on the default provider.
pub struct ArticleEditor {
    router: Arc<ProviderRouter>,
    logger: Logger,
}

impl fmt::Debug for ArticleEditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArticleEditor")
            .field("router", &self.router)
            .finish()
    }
}

impl ArticleEditor {
    pub fn new(router: Arc<ProviderRouter>) -> Self {
        Self {
            router,
            logger: Logger::new(),
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Rewrites the byte range `range` of the body. The caller keeps
    /// `article` untouched on error.
    pub async fn rewrite_selection(
        &self,
        article: &Article,
        range: Range<usize>,
        tone: &str,
        length: &str,
    ) -> Result<Article> {
        let selection = article
            .body_markdown
            .get(range.clone())
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| Error::InvalidEdit(format!("no text selected at {}..{}", range.start, range.end)))?;

        let prompt = rewrite_prompt(selection, tone, length);
        let call = GenerationCall::new(SYSTEM_PERSONA, &prompt, ModelTier::Flash);
        let replacement = match self.router.call_default(&call).await {
            Ok(text) => text.trim().to_string(),
            // nothing usable came back: keep the original selection
            Err(Error::EmptyResponse(_)) => return Ok(article.clone()),
            Err(e) => {
                self.logger.error("Failed to rewrite text");
                return Err(e);
            }
        };

        let updated = revision::apply_rewrite(article.clone(), range, &replacement)?;
        self.logger.success("Content rewritten successfully");
        Ok(updated)
    }

    /// Applies a free-form instruction to the whole article. Both sides of
    /// the exchange are recorded in the conversation log.
    pub async fn refine_with_chat(&self, article: Article, instruction: &str) -> ChatOutcome {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return ChatOutcome {
                article,
                applied: false,
            };
        }

        let article = revision::record_turn(article, ChatRole::User, instruction);
        let article = revision::snapshot(
            article,
            format!("Before chat edit: \"{}\"", revision::note_excerpt(instruction, 15)),
        );

        let prompt = refine_prompt(&article.body_markdown, instruction);
        let call = GenerationCall::new(SYSTEM_PERSONA, &prompt, ModelTier::Flash);
        match self.router.call_default(&call).await {
            Ok(body) => {
                let article = revision::apply_refinement(article, body);
                self.logger.success("Article refined by AI assistant");
                ChatOutcome {
                    article: revision::record_turn(article, ChatRole::Assistant, ASSISTANT_UPDATED),
                    applied: true,
                }
            }
            Err(e) => {
                self.logger.error("Assistant failed to update article");
                self.logger.debug(&e.to_string());
                ChatOutcome {
                    article: revision::record_turn(article, ChatRole::Assistant, ASSISTANT_FAILED),
                    applied: false,
                }
            }
        }
    }

    /// Peer review as a bullet list. Does not touch the article.
    pub async fn review_article(&self, article: &Article) -> Result<String> {
        self.logger.info("Starting peer review...");
        let prompt = review_prompt(&article.body_markdown);
        let call = GenerationCall::new(REVIEWER_PERSONA, &prompt, ModelTier::Flash);
        match self.router.call_default(&call).await {
            Ok(review) => {
                self.logger.success("Review complete.");
                Ok(review)
            }
            Err(Error::EmptyResponse(_)) => Ok(NO_REVIEW.to_string()),
            Err(e) => {
                self.logger.error("Review failed.");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sg_core::{ArticleMetadata, ContentRequest, Provider};
    use sg_inference::models::dummy::DummyProvider;

    const BODY: &str = "# zeta guide\n\nThis sentence rambles on and on without any clear end in sight at all.\n";

    fn article() -> Article {
        let request = ContentRequest::new("zeta guide", "zeta");
        Article::new(&request, ArticleMetadata::fallback("zeta guide"), BODY.to_string(), Provider::Gemini)
    }

    fn editor(provider: DummyProvider) -> (ArticleEditor, Arc<DummyProvider>) {
        let provider = Arc::new(provider);
        let router = Arc::new(ProviderRouter::new().with_provider(provider.clone()));
        (ArticleEditor::new(router), provider)
    }

    fn selection(article: &Article) -> Range<usize> {
        let start = article.body_markdown.find("This").unwrap();
        start..article.body_markdown.len() - 1
    }

    #[tokio::test]
    async fn test_rewrite_selection_splices_and_snapshots() {
        let (editor, provider) = editor(DummyProvider::always(Provider::Gemini, "  Short and clear.  "));
        let original = article();
        let range = selection(&original);
        let updated = editor
            .rewrite_selection(&original, range, "casual", "shorter")
            .await
            .unwrap();

        assert_eq!(updated.body_markdown, "# zeta guide\n\nShort and clear.\n");
        assert_eq!(updated.revision_history[0].note, revision::NOTE_BEFORE_REWRITE);
        assert_eq!(updated.revision_history[0].body_markdown, BODY);
        let call = &provider.calls()[0];
        assert_eq!(call.tier, ModelTier::Flash);
        assert!(call.user_prompt.contains("rambles on"));
    }

    #[tokio::test]
    async fn test_rewrite_failure_leaves_no_snapshot() {
        let (editor, _) = editor(DummyProvider::failing(Provider::Gemini, "down"));
        let original = article();
        let range = selection(&original);
        assert!(editor.rewrite_selection(&original, range, "casual", "same").await.is_err());
        assert!(original.revision_history.is_empty());
    }

    #[tokio::test]
    async fn test_rewrite_empty_output_keeps_selection() {
        let (editor, _) = editor(DummyProvider::always(Provider::Gemini, ""));
        let original = article();
        let range = selection(&original);
        let updated = editor.rewrite_selection(&original, range, "casual", "same").await.unwrap();
        assert_eq!(updated.body_markdown, BODY);
        assert!(updated.revision_history.is_empty());
    }

    #[tokio::test]
    async fn test_rewrite_rejects_bad_selection() {
        let (editor, provider) = editor(DummyProvider::always(Provider::Gemini, "x"));
        let original = article();
        assert!(matches!(
            editor.rewrite_selection(&original, 5..500, "casual", "same").await,
            Err(Error::InvalidEdit(_))
        ));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_refine_with_chat_records_turns() {
        let (editor, _) = editor(DummyProvider::always(Provider::Gemini, "# zeta guide\n\nNew zeta body."));
        let outcome = editor.refine_with_chat(article(), "make it more casual please").await;

        assert!(outcome.applied);
        let article = outcome.article;
        assert_eq!(article.body_markdown, "# zeta guide\n\nNew zeta body.");
        assert_eq!(article.revision_history[0].note, "Before chat edit: \"make it more ca...\"");
        assert_eq!(article.revision_history[0].body_markdown, BODY);
        assert_eq!(article.conversation_log.len(), 2);
        assert_eq!(article.conversation_log[0].role, ChatRole::User);
        assert_eq!(article.conversation_log[1].text, ASSISTANT_UPDATED);
    }

    #[tokio::test]
    async fn test_refine_failure_apologizes() {
        let (editor, _) = editor(DummyProvider::failing(Provider::Gemini, "down"));
        let outcome = editor.refine_with_chat(article(), "add a faq").await;

        assert!(!outcome.applied);
        assert_eq!(outcome.article.body_markdown, BODY);
        assert_eq!(outcome.article.conversation_log[1].text, ASSISTANT_FAILED);
    }

    #[tokio::test]
    async fn test_blank_instruction_is_ignored() {
        let (editor, provider) = editor(DummyProvider::always(Provider::Gemini, "x"));
        let outcome = editor.refine_with_chat(article(), "   ").await;
        assert!(!outcome.applied);
        assert!(outcome.article.conversation_log.is_empty());
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_review_uses_reviewer_persona() {
        let (editor, provider) = editor(DummyProvider::always(Provider::Gemini, "- shorten sentences"));
        let original = article();
        let review = editor.review_article(&original).await.unwrap();
        assert_eq!(review, "- shorten sentences");
        assert_eq!(provider.calls()[0].system_prompt, REVIEWER_PERSONA);
    }

    #[tokio::test]
    async fn test_empty_review_has_placeholder() {
        let (editor, _) = editor(DummyProvider::always(Provider::Gemini, " "));
        assert_eq!(editor.review_article(&article()).await.unwrap(), NO_REVIEW);
    }
}
