pub mod error;
pub mod markdown;
pub mod models;
pub mod revision;
pub mod seo;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
pub use models::{AspectRatio, GenerationCall, ImageGenerator, ModelTier, ResponseFormat, TextGenerationProvider};
pub use storage::ArticleStorage;
pub use types::{
    Article, ArticleMetadata, ArticleVersion, ChatRole, ChatTurn, ClusterPlan, ClusterTopic,
    ContentKind, ContentRequest, DensityBand, Provider, TemplateId, ValidationResult,
};
