pub mod editing;
pub mod images;
pub mod logging;
pub mod orchestrator;
pub mod progress;

pub use editing::{ArticleEditor, ChatOutcome};
pub use images::{ImageOutcome, ImagePipeline};
pub use logging::{init_logging, LogEntry, LogLevel, LogSink, Logger, MemoryLogSink};
pub use orchestrator::{BatchOutcome, GenerationOrchestrator};
pub use progress::{BatchEvent, BatchStatus, ProgressReporter};

pub mod prelude {
    pub use super::{ArticleEditor, GenerationOrchestrator, ImagePipeline, Logger};
    pub use sg_core::{Article, ContentRequest, Error, Result};
}
