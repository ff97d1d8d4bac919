use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use sg_core::{Article, ArticleStorage, ClusterPlan, ContentKind, ContentRequest, Provider, Result};
use sg_inference::cluster::ClusterPlanner;
use sg_inference::parser::parse_response;
use sg_inference::prompt::build_prompt;
use sg_inference::router::ProviderRouter;

use crate::logging::Logger;
use crate::progress::{BatchEvent, BatchStatus, NoProgress, ProgressReporter};

/// Result of a batch. Articles produced before a failure are kept.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub articles: Vec<Article>,
    pub status: BatchStatus,
    pub plan: Option<ClusterPlan>,
    pub error: Option<String>,
}

impl BatchOutcome {
    fn failed(articles: Vec<Article>, plan: Option<ClusterPlan>, error: String) -> Self {
        Self {
            articles,
            status: BatchStatus::Failed,
            plan,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == BatchStatus::Done
    }
}

/// Drives prompt building, provider routing, parsing and scoring for
/// single articles and whole clusters.
pub struct GenerationOrchestrator {
    router: Arc<ProviderRouter>,
    planner: ClusterPlanner,
    storage: Arc<dyn ArticleStorage>,
    logger: Logger,
    progress: Arc<dyn ProgressReporter>,
}

impl fmt::Debug for GenerationOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationOrchestrator")
            .field("router", &self.router)
            .field("storage", &"<dyn ArticleStorage>")
            .finish()
    }
}

impl GenerationOrchestrator {
    pub fn new(router: Arc<ProviderRouter>, storage: Arc<dyn ArticleStorage>) -> Self {
        Self {
            planner: ClusterPlanner::new(router.clone()),
            router,
            storage,
            logger: Logger::new(),
            progress: Arc::new(NoProgress),
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn router(&self) -> &Arc<ProviderRouter> {
        &self.router
    }

    pub fn storage(&self) -> &Arc<dyn ArticleStorage> {
        &self.storage
    }

    fn set_status(&self, status: BatchStatus) {
        self.progress.report(BatchEvent::StatusChanged { status });
    }

    /// Calls the requested provider. A failing non-default provider is
    /// retried once through the default provider; the returned [`Provider`]
    /// is the one whose text was actually used.
    async fn generate_text(
        &self,
        prompt: &str,
        request: &ContentRequest,
        logger: &Logger,
    ) -> Result<(String, Provider)> {
        match self.router.generate(prompt, request).await {
            Ok(text) => Ok((text, request.provider)),
            Err(e) if !request.provider.is_default() => {
                let fallback = Provider::default();
                logger.warn(&format!(
                    "{} generation failed: {}. Falling back to {}.",
                    request.provider, e, fallback
                ));
                self.progress.report(BatchEvent::FellBack {
                    from: request.provider,
                    to: fallback,
                    reason: e.to_string(),
                });
                let text = self.router.generate_default(prompt, request).await?;
                Ok((text, fallback))
            }
            Err(e) => Err(e),
        }
    }

    /// Prompt, provider (with fallback), parse and score one article.
    /// Nothing is stored.
    pub async fn generate_article(&self, request: &ContentRequest) -> Result<Article> {
        self.generate_logged(request, &self.logger).await
    }

    async fn generate_logged(&self, request: &ContentRequest, logger: &Logger) -> Result<Article> {
        let prompt = build_prompt(request);
        let (text, generated_by) = self.generate_text(&prompt, request, logger).await?;
        let parsed = parse_response(&text, &request.topic);
        Ok(Article::new(request, parsed.metadata, parsed.body, generated_by))
    }

    async fn persist(&self, article: &Article) {
        // a storage hiccup must not cost the caller a generated article
        if let Err(e) = self.storage.put(article).await {
            self.logger.error(&format!("Failed to store \"{}\": {}", article.title(), e));
        }
    }

    /// Runs tasks in order. The first failure stops the queue.
    async fn run_queue(&self, tasks: Vec<ContentRequest>, plan: Option<ClusterPlan>) -> BatchOutcome {
        let total = tasks.len();
        let mut articles = Vec::with_capacity(total);
        self.set_status(BatchStatus::Generating { completed: 0, total });

        for (i, task) in tasks.iter().enumerate() {
            let index = i + 1;
            self.logger.info(&format!(
                "Generating {}/{}: {} - \"{}\" with {}...",
                index, total, task.kind, task.topic, task.provider
            ));
            self.progress.report(BatchEvent::TaskStarted {
                index,
                total,
                title: task.topic.clone(),
            });

            let task_logger = self.logger.clone().with_prefix(format!("[{}/{}]", index, total));
            match self.generate_logged(task, &task_logger).await {
                Ok(article) => {
                    self.persist(&article).await;
                    self.progress.report(BatchEvent::TaskCompleted {
                        index,
                        total,
                        title: article.title().to_string(),
                        score: article.score().unwrap_or(0),
                    });
                    self.set_status(BatchStatus::Generating { completed: index, total });
                    articles.push(article);
                }
                Err(e) => {
                    task_logger.error(&format!("Generation failed: {}", e));
                    self.progress.report(BatchEvent::TaskFailed {
                        index,
                        total,
                        title: task.topic.clone(),
                        error: e.to_string(),
                    });
                    self.set_status(BatchStatus::Failed);
                    return BatchOutcome::failed(articles, plan, e.to_string());
                }
            }
        }

        self.set_status(BatchStatus::Done);
        BatchOutcome {
            articles,
            status: BatchStatus::Done,
            plan,
            error: None,
        }
    }

    /// A queue of one. Never fails; see the outcome's status.
    pub async fn generate_single(&self, request: ContentRequest) -> BatchOutcome {
        self.logger
            .info(&format!("Generating single article using {}...", request.provider));
        let outcome = self.run_queue(vec![request], None).await;
        if outcome.is_success() {
            self.logger.success("Article generated successfully!");
        }
        outcome
    }

    /// Per-task requests for a plan: pillar first (aligned with the
    /// satellite titles), then each satellite pointing at the pillar.
    pub fn cluster_tasks(plan: &ClusterPlan, base: &ContentRequest) -> Vec<ContentRequest> {
        let pillar = ContentRequest {
            topic: plan.pillar.title.clone(),
            main_keyword: plan.pillar.main_keyword.clone(),
            kind: ContentKind::Pillar,
            related_parent_topic: None,
            alignment_themes: plan.alignment_themes(),
            ..base.clone()
        };
        let satellites = plan.satellites.iter().map(|satellite| ContentRequest {
            topic: satellite.title.clone(),
            main_keyword: satellite.main_keyword.clone(),
            kind: ContentKind::Satellite,
            related_parent_topic: Some(plan.pillar.title.clone()),
            alignment_themes: Vec::new(),
            ..base.clone()
        });
        std::iter::once(pillar).chain(satellites).collect()
    }

    /// Generates an already planned cluster.
    pub async fn generate_from_plan(&self, plan: ClusterPlan, base: &ContentRequest) -> BatchOutcome {
        let tasks = Self::cluster_tasks(&plan, base);
        self.logger.success(&format!(
            "Plan created. Starting batch generation ({} articles)...",
            tasks.len()
        ));
        let outcome = self.run_queue(tasks, Some(plan)).await;
        if outcome.is_success() {
            self.logger.success(&format!(
                "Cluster Generation Complete! {} Articles ready.",
                outcome.articles.len()
            ));
        } else {
            self.logger.error("Cluster generation stopped due to error.");
        }
        outcome
    }

    /// Plans a cluster around `base.topic` and generates every article in it.
    pub async fn generate_cluster(&self, base: &ContentRequest) -> BatchOutcome {
        self.set_status(BatchStatus::Planning);
        self.logger.info(&format!(
            "Phase 1: Designing Cluster Plan (Pillar + {} Satellites)...",
            sg_inference::cluster::SATELLITE_COUNT
        ));

        let plan = match self.planner.plan(&base.topic).await {
            Ok(plan) => plan,
            Err(e) => {
                self.logger.error(&format!("Cluster planning failed: {}", e));
                self.set_status(BatchStatus::Failed);
                return BatchOutcome::failed(Vec::new(), None, format!("planning failed: {}", e));
            }
        };

        self.generate_from_plan(plan, base).await
    }
}
