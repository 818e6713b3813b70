use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;
use wd_core::{
    assemble, partition, AggregateRecord, BackendSelector, Error, GenerationBackend, GenerationError,
    GenerationErrorKind, PromptBuilder, Result, SegmentResult, SourceDocument,
};

use super::processor::SegmentProcessor;
use crate::models::create_model;
use crate::{Config, DEFAULT_MAX_CONCURRENT_CALLS, DEFAULT_PARTITIONS};

/// Partitions a transcript, fans the segments out to a backend and merges
/// the answers into one record.
///
/// Dropping the future returned by [`Pipeline::run`] aborts every segment
/// task still in flight.
pub struct Pipeline {
    backend: Arc<dyn GenerationBackend>,
    partitions: usize,
    prompts: PromptBuilder,
    call_timeout: Option<Duration>,
    max_concurrent_calls: usize,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("backend", &self.backend.name())
            .field("partitions", &self.partitions)
            .field("call_timeout", &self.call_timeout)
            .field("max_concurrent_calls", &self.max_concurrent_calls)
            .finish()
    }
}

impl Pipeline {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            backend,
            partitions: DEFAULT_PARTITIONS,
            prompts: PromptBuilder::default(),
            call_timeout: None,
            max_concurrent_calls: DEFAULT_MAX_CONCURRENT_CALLS,
        }
    }

    pub fn from_config(backend: Arc<dyn GenerationBackend>, config: &Config) -> Self {
        Self::new(backend)
            .with_partitions(config.partitions)
            .with_prompts(PromptBuilder::new(config.context.clone()))
            .with_call_timeout(config.call_timeout)
            .with_max_concurrent_calls(config.max_concurrent_calls)
    }

    pub fn with_partitions(mut self, partitions: usize) -> Self {
        self.partitions = partitions;
        self
    }

    pub fn with_prompts(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Option<Duration>) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn with_max_concurrent_calls(mut self, max_concurrent_calls: usize) -> Self {
        self.max_concurrent_calls = max_concurrent_calls;
        self
    }

    pub fn backend(&self) -> &Arc<dyn GenerationBackend> {
        &self.backend
    }

    pub async fn run(&self, document: &SourceDocument) -> Result<AggregateRecord> {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline", %run_id, backend = self.backend.name());
        self.run_inner(document).instrument(span).await
    }

    async fn run_inner(&self, document: &SourceDocument) -> Result<AggregateRecord> {
        if document.transcript.trim().is_empty() {
            return Err(Error::Input("transcript is empty".to_string()));
        }

        info!(
            "📰 Processing \"{}\" ({}) in {} parts",
            document.metadata.title,
            document.metadata.date_label(),
            self.partitions
        );
        let segments = partition(&document.transcript, self.partitions)?;
        if segments.is_empty() {
            return Err(Error::Partition("no segments were produced".to_string()));
        }
        let indices: Vec<usize> = segments.iter().map(|s| s.index).collect();

        let processor = SegmentProcessor::new(
            self.backend.clone(),
            self.prompts.clone(),
            self.max_concurrent_calls,
            self.call_timeout,
        );

        let mut tasks = JoinSet::new();
        for segment in segments {
            let processor = processor.clone();
            tasks.spawn(
                async move {
                    let index = segment.index;
                    (index, processor.process(segment).await)
                }
                .in_current_span(),
            );
        }
        info!("🚀 Dispatched {} segment tasks", indices.len());

        let mut results: BTreeMap<usize, SegmentResult> = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => {
                    info!("✨ Segment {} finished ({} of 3 calls failed)", index, result.error_count());
                    results.insert(index, result);
                }
                Err(e) => error!("💥 Segment task died: {}", e),
            }
        }

        for index in indices {
            results.entry(index).or_insert_with(|| {
                SegmentResult::failed(
                    index,
                    GenerationError::new(GenerationErrorKind::Internal, "segment task did not complete"),
                )
            });
        }

        let record = assemble(&document.metadata, &document.transcript, &results);
        info!("✅ Assembled record with {} parts", record.partition_count());
        Ok(record)
    }
}

/// Resolves the backend once and runs the whole pipeline with `config`.
pub async fn run_pipeline(
    document: &SourceDocument,
    selector: &BackendSelector,
    config: &Config,
) -> Result<AggregateRecord> {
    if document.transcript.trim().is_empty() {
        return Err(Error::Input("transcript is empty".to_string()));
    }
    let backend = create_model(selector, config)?;
    Pipeline::from_config(backend, config).run(document).await
}
