use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use sg_core::markdown::{find_images, MarkdownImage};
use sg_core::revision::{self, note_excerpt};
use sg_core::{Article, AspectRatio, ImageGenerator};
use sg_inference::prompt::image_prompt;

use crate::logging::Logger;

#[derive(Debug, Clone)]
pub struct ImageOutcome {
    pub article: Article,
    /// Occurrence indexes whose URL was replaced.
    pub generated: Vec<usize>,
    /// Occurrence indexes left untouched, with the reason.
    pub failed: Vec<(usize, String)>,
}

impl ImageOutcome {
    fn unchanged(article: Article) -> Self {
        Self {
            article,
            generated: Vec::new(),
            failed: Vec::new(),
        }
    }
}

/// Replaces placeholder images in an article body with generated ones.
pub struct ImagePipeline {
    generator: Arc<dyn ImageGenerator>,
    logger: Logger,
}

impl fmt::Debug for ImagePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePipeline")
            .field("generator", &self.generator)
            .finish()
    }
}

impl ImagePipeline {
    pub fn new(generator: Arc<dyn ImageGenerator>) -> Self {
        Self {
            generator,
            logger: Logger::new(),
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Images still pointing at a placeholder.
    pub fn pending_images(article: &Article) -> Vec<MarkdownImage> {
        find_images(&article.body_markdown)
            .into_iter()
            .filter(MarkdownImage::needs_generation)
            .collect()
    }

    /// Generates the image at occurrence `index`, whatever its current URL.
    pub async fn generate_one(&self, article: Article, index: usize, aspect_ratio: AspectRatio) -> ImageOutcome {
        let Some(image) = find_images(&article.body_markdown)
            .into_iter()
            .find(|img| img.index == index)
        else {
            self.logger.error(&format!("No image at position {}", index));
            let mut outcome = ImageOutcome::unchanged(article);
            outcome.failed.push((index, "no image at this position".to_string()));
            return outcome;
        };

        let article = revision::snapshot(
            article,
            format!("Before generating image: {}", note_excerpt(&image.alt, 20)),
        );
        self.logger.info(&format!(
            "Generating real image ({}) for: \"{}\"...",
            aspect_ratio, image.alt
        ));

        let prompt = image_prompt(article.title(), &image.alt);
        match self.generator.generate_image(&prompt, aspect_ratio).await {
            Ok(url) => {
                self.logger.success("Image generated and injected!");
                ImageOutcome {
                    article: revision::apply_image_result(article, index, url),
                    generated: vec![index],
                    failed: Vec::new(),
                }
            }
            Err(e) => {
                self.logger.error("Image generation failed.");
                self.logger.debug(&e.to_string());
                let mut outcome = ImageOutcome::unchanged(article);
                outcome.failed.push((index, e.to_string()));
                outcome
            }
        }
    }

    /// Generates every pending image concurrently. Each failure only keeps
    /// its own placeholder; successes land in one pass by occurrence index.
    pub async fn generate_all(&self, article: Article, aspect_ratio: AspectRatio) -> ImageOutcome {
        let targets = Self::pending_images(&article);
        if targets.is_empty() {
            self.logger.info("No placeholder images found to generate.");
            return ImageOutcome::unchanged(article);
        }

        let article = revision::snapshot(
            article,
            format!("Before batch image generation ({} images)", targets.len()),
        );
        self.logger
            .info(&format!("Starting batch generation for {} images...", targets.len()));

        let title = article.title().to_string();
        let tasks = targets.iter().map(|image| {
            let generator = self.generator.clone();
            let logger = self.logger.clone();
            let prompt = image_prompt(&title, &image.alt);
            async move {
                logger.info(&format!("Generating image: \"{}\"...", image.alt));
                let result = generator.generate_image(&prompt, aspect_ratio).await;
                if result.is_err() {
                    logger.error(&format!("Failed to generate image for \"{}\"", image.alt));
                }
                (image.index, result)
            }
        });
        let results = join_all(tasks).await;

        let mut replacements = HashMap::new();
        let mut generated = Vec::new();
        let mut failed = Vec::new();
        for (index, result) in results {
            match result {
                Ok(url) => {
                    replacements.insert(index, url);
                    generated.push(index);
                }
                Err(e) => failed.push((index, e.to_string())),
            }
        }

        let article = revision::apply_image_results(article, &replacements);
        self.logger.success("Batch generation completed!");
        ImageOutcome {
            article,
            generated,
            failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sg_core::{ArticleMetadata, ContentRequest, Provider};
    use sg_inference::models::dummy::DummyImageGenerator;

    const BODY: &str = "# zeta\n\n![COVER: zeta](https://placehold.co/1200x600)\n\n![chart](https://placehold.co/800x400)\n\n![done](data:image/png;base64,AAA)\n\n![chart](https://placehold.co/600x600)\n";

    fn article() -> Article {
        let request = ContentRequest::new("zeta", "zeta");
        Article::new(&request, ArticleMetadata::fallback("zeta"), BODY.to_string(), Provider::Gemini)
    }

    #[tokio::test]
    async fn test_generate_all_replaces_pending_only() {
        let generator = Arc::new(DummyImageGenerator::new());
        let pipeline = ImagePipeline::new(generator.clone());
        let outcome = pipeline.generate_all(article(), AspectRatio::Landscape).await;

        assert_eq!(generator.call_count(), 3);
        let mut generated = outcome.generated.clone();
        generated.sort();
        assert_eq!(generated, vec![0, 1, 3]);
        assert!(outcome.failed.is_empty());
        assert!(ImagePipeline::pending_images(&outcome.article).is_empty());
        assert_eq!(
            outcome.article.revision_history[0].note,
            "Before batch image generation (3 images)"
        );
        assert_eq!(outcome.article.revision_history[0].body_markdown, BODY);
        assert!(outcome.article.body_markdown.contains("![done](data:image/png;base64,AAA)"));
    }

    #[tokio::test]
    async fn test_failed_image_keeps_placeholder() {
        let generator = Arc::new(DummyImageGenerator::new().failing_on("COVER"));
        let pipeline = ImagePipeline::new(generator);
        let outcome = pipeline.generate_all(article(), AspectRatio::Square).await;

        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].0, 0);
        let images = find_images(&outcome.article.body_markdown);
        assert_eq!(images[0].url, "https://placehold.co/1200x600");
        assert!(!images[1].needs_generation());
        assert!(!images[3].needs_generation());
    }

    #[tokio::test]
    async fn test_no_targets_means_no_snapshot() {
        let request = ContentRequest::new("zeta", "zeta");
        let plain = Article::new(&request, ArticleMetadata::fallback("zeta"), "# zeta".to_string(), Provider::Gemini);
        let pipeline = ImagePipeline::new(Arc::new(DummyImageGenerator::new()));
        let outcome = pipeline.generate_all(plain, AspectRatio::Landscape).await;
        assert!(outcome.article.revision_history.is_empty());
        assert!(outcome.generated.is_empty());
    }

    #[tokio::test]
    async fn test_generate_one_targets_occurrence() {
        let pipeline = ImagePipeline::new(Arc::new(DummyImageGenerator::new()));
        let outcome = pipeline.generate_one(article(), 3, AspectRatio::Portrait).await;

        assert_eq!(outcome.generated, vec![3]);
        let images = find_images(&outcome.article.body_markdown);
        assert!(images[1].needs_generation());
        assert!(!images[3].needs_generation());
        assert_eq!(outcome.article.revision_history[0].note, "Before generating image: chart...");
    }

    #[tokio::test]
    async fn test_generate_one_unknown_index() {
        let pipeline = ImagePipeline::new(Arc::new(DummyImageGenerator::new()));
        let outcome = pipeline.generate_one(article(), 9, AspectRatio::Landscape).await;
        assert_eq!(outcome.failed.len(), 1);
        assert!(outcome.article.revision_history.is_empty());
    }
}
