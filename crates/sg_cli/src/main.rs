use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use sg_core::{
    markdown, revision, seo, Article, ArticleStorage, AspectRatio, ContentKind, ContentRequest, ImageGenerator,
    Provider, TemplateId,
};
use sg_inference::cluster::ClusterPlanner;
use sg_inference::models::dummy::DummyImageGenerator;
use sg_inference::models::image::GeminiImageGenerator;
use sg_inference::research::{NicheBrief, Researcher};
use sg_inference::{Config, ProviderRouter};
use sg_pipeline::progress::StderrProgress;
use sg_pipeline::{init_logging, ArticleEditor, BatchOutcome, GenerationOrchestrator, ImagePipeline, Logger};
use sg_storage::{open_storage, StorageKind};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "SEO article generation pipeline", long_about = None)]
pub struct Cli {
    /// Storage backend: sqlite (default, kept across runs) or memory (lasts one run)
    #[arg(long, default_value = "sqlite", global = true)]
    storage: StorageKind,
    /// SQLite database file; defaults to articles.db
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,
    /// Provider used for article text: gemini (default), openai, claude
    #[arg(long, default_value = "gemini", global = true)]
    provider: Provider,
    /// API key for the selected provider; overrides the environment
    #[arg(long, global = true)]
    api_key: Option<String>,
    /// Answer every call with canned output instead of hitting a provider
    #[arg(long, global = true)]
    offline: bool,
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Suggest four pillar topics for a niche
    Suggest {
        #[arg(long)]
        niche: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        sub_niche: Option<String>,
        #[arg(long)]
        micro_niche: Option<String>,
    },
    /// Research keywords and audience for a topic
    Research { topic: String },
    /// Design a cluster plan without generating anything
    Plan { topic: String },
    /// Generate a single article
    Generate {
        #[command(flatten)]
        request: RequestArgs,
        #[arg(long, default_value = "pillar")]
        kind: ContentKind,
        #[arg(long)]
        template: Option<TemplateId>,
        /// Pillar this satellite links back to
        #[arg(long)]
        parent: Option<String>,
    },
    /// Plan and generate a pillar plus its satellites
    Cluster {
        #[command(flatten)]
        request: RequestArgs,
    },
    /// Score a Markdown file and print the publication checklist
    Validate {
        file: PathBuf,
        #[arg(long)]
        keyword: String,
        #[arg(long, value_delimiter = ',')]
        secondary: Vec<String>,
    },
    /// List stored articles
    List,
    /// Print a stored article
    Show {
        id: String,
        /// Print the publishing export with title, slug and meta header
        #[arg(long)]
        export: bool,
    },
    /// Show the revision history of an article
    History { id: String },
    /// Restore an earlier version of an article
    Restore { id: String, version: String },
    /// Replace placeholder images with generated ones
    Images {
        id: String,
        /// Only this image occurrence
        #[arg(long)]
        index: Option<usize>,
        #[arg(long, default_value = "16:9")]
        aspect_ratio: AspectRatio,
    },
    /// Rewrite a byte range of the body
    Rewrite {
        id: String,
        #[arg(long)]
        start: usize,
        #[arg(long)]
        end: usize,
        #[arg(long, default_value = "professional")]
        tone: String,
        #[arg(long, default_value = "same")]
        length: String,
    },
    /// Ask the assistant to edit the whole article
    Refine { id: String, instruction: String },
    /// Ask for a peer review of an article
    Review { id: String },
}

#[derive(clap::Args, Debug)]
struct RequestArgs {
    #[arg(long)]
    topic: String,
    /// Main keyword; defaults to the topic
    #[arg(long)]
    keyword: Option<String>,
    #[arg(long, default_value = "")]
    audience: String,
    #[arg(long, value_delimiter = ',')]
    secondary: Vec<String>,
}

impl RequestArgs {
    fn into_request(self, provider: Provider, api_key: Option<String>) -> ContentRequest {
        let keyword = self.keyword.unwrap_or_else(|| self.topic.clone());
        ContentRequest::new(self.topic, keyword)
            .with_audience(self.audience)
            .with_secondary_keywords(self.secondary)
            .with_provider(provider)
            .with_credential(api_key)
    }
}

fn build_router(offline: bool, config: &Config) -> ProviderRouter {
    if offline {
        ProviderRouter::offline()
    } else {
        ProviderRouter::from_config(config)
    }
}

fn build_image_generator(offline: bool, config: &Config) -> Arc<dyn ImageGenerator> {
    if offline {
        Arc::new(DummyImageGenerator::new())
    } else {
        Arc::new(GeminiImageGenerator::new(config.clone()))
    }
}

async fn load(storage: &Arc<dyn ArticleStorage>, id: &str) -> anyhow::Result<Article> {
    storage
        .get(id)
        .await?
        .ok_or_else(|| anyhow!("No article with id {}", id))
}

fn print_outcome(outcome: &BatchOutcome) {
    for article in &outcome.articles {
        println!(
            "{}  [{}] {} (score {}, by {})",
            article.id,
            article.kind,
            article.title(),
            article.score().unwrap_or(0),
            article.generated_by
        );
    }
    if let Some(error) = &outcome.error {
        eprintln!("❌ {}", error);
    }
}

fn print_article(article: &Article) {
    println!("{}  {}", article.id, article.title());
    println!("   {}", markdown::excerpt(&article.metadata.meta_description, 100));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let logger: Logger = init_logging(cli.verbose);

    let mut config = Config::from_env();
    if let Some(key) = &cli.api_key {
        config = config.with_api_key(cli.provider, key.clone());
    }
    let router = Arc::new(build_router(cli.offline, &config));

    let storage = open_storage(cli.storage, cli.db_path.as_deref())
        .await
        .with_context(|| format!("opening {} storage", cli.storage))?;
    info!("💾 Storage initialized (using {})", cli.storage);

    let orchestrator = GenerationOrchestrator::new(router.clone(), storage.clone())
        .with_logger(logger.clone())
        .with_progress(Arc::new(StderrProgress));
    let editor = ArticleEditor::new(router.clone()).with_logger(logger.clone());

    match cli.command {
        Commands::Suggest {
            niche,
            category,
            sub_niche,
            micro_niche,
        } => {
            let brief = NicheBrief {
                niche,
                category,
                sub_niche,
                micro_niche,
            };
            let suggestions = Researcher::new(router.clone()).suggest_topics(&brief).await;
            if suggestions.is_empty() {
                eprintln!("No suggestions available.");
            }
            for suggestion in suggestions {
                println!("{:>3}  {}", suggestion.score, suggestion.topic);
            }
        }
        Commands::Research { topic } => {
            let research = Researcher::new(router.clone()).research_keywords(&topic).await?;
            println!("{}", serde_json::to_string_pretty(&research)?);
        }
        Commands::Plan { topic } => {
            let plan = ClusterPlanner::new(router.clone()).plan(&topic).await?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        Commands::Generate {
            request: args,
            kind,
            template,
            parent,
        } => {
            let mut request = args.into_request(cli.provider, cli.api_key.clone()).with_kind(kind);
            if let Some(template) = template {
                request = request.with_template(template);
            }
            if let Some(parent) = parent {
                request = request.with_parent_topic(parent);
            }
            let outcome = orchestrator.generate_single(request).await;
            print_outcome(&outcome);
            if !outcome.is_success() {
                bail!("generation failed");
            }
        }
        Commands::Cluster { request: args } => {
            let base = args.into_request(cli.provider, cli.api_key.clone());
            let outcome = orchestrator.generate_cluster(&base).await;
            print_outcome(&outcome);
            if !outcome.is_success() {
                bail!(
                    "cluster generation stopped after {} article(s)",
                    outcome.articles.len()
                );
            }
        }
        Commands::Validate {
            file,
            keyword,
            secondary,
        } => {
            let body = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let result = seo::validate(&body, &keyword, &secondary);
            println!("Score: {}/100", result.score);
            println!(
                "Words: {}  Density: {:.2}% ({})  Secondary hits: {}",
                result.word_count, result.keyword_density, result.keyword_density_band, result.secondary_keyword_hits
            );
            let checklist = seo::publication_checklist(&result);
            for item in &checklist {
                println!(
                    "[{}] {:>2}. {} ({:?})",
                    if item.checked { "x" } else { " " },
                    item.id,
                    item.label,
                    item.category
                );
            }
            println!("Checklist: {}%", seo::checklist_progress(&checklist));
        }
        Commands::List => {
            let articles = storage.list().await?;
            if articles.is_empty() {
                println!("No articles stored.");
            }
            for article in &articles {
                print_article(article);
            }
        }
        Commands::Show { id, export } => {
            let article = load(&storage, &id).await?;
            if export {
                println!("{}", article.export_markdown());
            } else {
                println!("{}", article.body_markdown);
            }
        }
        Commands::History { id } => {
            let article = load(&storage, &id).await?;
            if article.revision_history.is_empty() {
                println!("No saved versions.");
            }
            for version in &article.revision_history {
                println!(
                    "{}  {}  {}",
                    version.id,
                    version.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    version.note
                );
            }
        }
        Commands::Restore { id, version } => {
            let article = load(&storage, &id).await?;
            let restored = revision::restore_by_id(article, &version)?;
            storage.put(&restored).await?;
            logger.success(&format!("Restored version {}", version));
        }
        Commands::Images {
            id,
            index,
            aspect_ratio,
        } => {
            let article = load(&storage, &id).await?;
            let pipeline =
                ImagePipeline::new(build_image_generator(cli.offline, &config)).with_logger(logger.clone());
            let outcome = match index {
                Some(index) => pipeline.generate_one(article, index, aspect_ratio).await,
                None => pipeline.generate_all(article, aspect_ratio).await,
            };
            storage.put(&outcome.article).await?;
            println!("Generated: {}  Failed: {}", outcome.generated.len(), outcome.failed.len());
            for (index, reason) in &outcome.failed {
                eprintln!("  image {}: {}", index, reason);
            }
        }
        Commands::Rewrite {
            id,
            start,
            end,
            tone,
            length,
        } => {
            let article = load(&storage, &id).await?;
            let updated = editor.rewrite_selection(&article, start..end, &tone, &length).await?;
            storage.put(&updated).await?;
            logger.success("Selection rewritten.");
        }
        Commands::Refine {
            id,
            instruction,
        } => {
            let article = load(&storage, &id).await?;
            let outcome = editor.refine_with_chat(article, &instruction).await;
            storage.put(&outcome.article).await?;
            if let Some(turn) = outcome.article.conversation_log.last() {
                println!("{}", turn.text);
            }
        }
        Commands::Review { id } => {
            let article = load(&storage, &id).await?;
            println!("{}", editor.review_article(&article).await?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_defaults_to_sqlite() {
        let cli = Cli::try_parse_from(["sg", "list"]).unwrap();
        assert_eq!(cli.storage, StorageKind::Sqlite);
        assert!(cli.db_path.is_none());
        assert!(!cli.offline);
    }

    #[test]
    fn test_memory_storage_and_offline_flags() {
        let cli = Cli::try_parse_from(["sg", "--storage", "memory", "--offline", "plan", "rust"]).unwrap();
        assert_eq!(cli.storage, StorageKind::Memory);
        assert!(cli.offline);
        assert!(matches!(cli.command, Commands::Plan { ref topic } if topic == "rust"));
    }
}
