use std::time::Duration;

use wd_core::prompts::DEFAULT_CONTEXT;

pub mod models;
pub mod pipeline;

pub use models::{OllamaCliConfig, OllamaConfig, OpenAiConfig};

pub const DEFAULT_PARTITIONS: usize = 2;
pub const DEFAULT_MAX_CONCURRENT_CALLS: usize = 10;
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(300);

/// Everything the adapters and the pipeline need, passed explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai: OpenAiConfig,
    pub ollama: OllamaConfig,
    pub ollama_cli: OllamaCliConfig,
    pub partitions: usize,
    pub call_timeout: Option<Duration>,
    pub max_concurrent_calls: usize,
    /// Opening sentence of every prompt.
    pub context: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai: OpenAiConfig::default(),
            ollama: OllamaConfig::default(),
            ollama_cli: OllamaCliConfig::default(),
            partitions: DEFAULT_PARTITIONS,
            call_timeout: Some(DEFAULT_CALL_TIMEOUT),
            max_concurrent_calls: DEFAULT_MAX_CONCURRENT_CALLS,
            context: DEFAULT_CONTEXT.to_string(),
        }
    }
}

pub mod prelude {
    pub use super::models::{create_model, ModelRegistry};
    pub use super::pipeline::{run_pipeline, Pipeline, SegmentProcessor};
    pub use super::Config;
    pub use wd_core::{AggregateRecord, BackendSelector, Error, Result, SourceDocument, SourceMetadata};
}

pub use models::{create_model, ModelRegistry};
pub use pipeline::{run_pipeline, Pipeline};
