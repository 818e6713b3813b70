use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, warn};
use wd_core::{
    GenerationBackend, GenerationError, GenerationErrorKind, GenerationOutcome, GenerationTask, PromptBuilder,
    Segment, SegmentResult,
};

/// Runs the three generation tasks for one segment against a shared backend.
///
/// Cheap to clone; every clone shares the backend and the call limiter.
#[derive(Clone)]
pub struct SegmentProcessor {
    backend: Arc<dyn GenerationBackend>,
    prompts: Arc<PromptBuilder>,
    permits: Arc<Semaphore>,
    call_timeout: Option<Duration>,
}

impl fmt::Debug for SegmentProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentProcessor")
            .field("backend", &self.backend.name())
            .field("available_permits", &self.permits.available_permits())
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}

impl SegmentProcessor {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        prompts: PromptBuilder,
        max_concurrent_calls: usize,
        call_timeout: Option<Duration>,
    ) -> Self {
        Self {
            backend,
            prompts: Arc::new(prompts),
            permits: Arc::new(Semaphore::new(max_concurrent_calls.max(1))),
            call_timeout,
        }
    }

    /// Never fails as a whole: every call's error lands in its own field.
    pub async fn process(&self, segment: Segment) -> SegmentResult {
        if segment.is_empty() {
            warn!("⚠️ Segment {} has no words, skipping generation", segment.index);
            return SegmentResult::failed(segment.index, GenerationError::empty_input());
        }

        debug!("📝 Processing segment {} ({} bytes)", segment.index, segment.text.len());
        let (summary, compliance_report, draft_posts) = futures::join!(
            self.call(GenerationTask::Summarize, &segment),
            self.call(GenerationTask::ComplianceAnalyze, &segment),
            self.call(GenerationTask::DraftPosts, &segment),
        );

        SegmentResult {
            index: segment.index,
            summary,
            compliance_report,
            draft_posts,
        }
    }

    async fn call(&self, task: GenerationTask, segment: &Segment) -> GenerationOutcome {
        let request = self.prompts.build(task, &segment.text);

        let _permit = self.permits.acquire().await.map_err(|_| {
            GenerationError::new(GenerationErrorKind::Internal, "call limiter closed")
        })?;

        debug!("🤖 {} for segment {} via {}", task, segment.index, self.backend.name());
        let outcome = match self.call_timeout {
            Some(limit) => tokio::time::timeout(limit, self.backend.generate(&request))
                .await
                .unwrap_or_else(|_| {
                    Err(GenerationError::new(
                        GenerationErrorKind::Timeout,
                        format!("{} gave no answer within {:?}", self.backend.name(), limit),
                    ))
                }),
            None => self.backend.generate(&request).await,
        };

        match &outcome {
            Ok(_) => debug!("✨ {} done for segment {}", task, segment.index),
            Err(e) => warn!("⚠️ {} failed for segment {}: {}", task, segment.index, e),
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DummyModel;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wd_core::GenerationRequest;

    #[derive(Debug, Default)]
    struct CountingModel {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GenerationBackend for CountingModel {
        fn name(&self) -> &str {
            "counting"
        }

        async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(request.task.to_string())
        }
    }

    #[derive(Debug)]
    struct StallingModel;

    #[async_trait]
    impl GenerationBackend for StallingModel {
        fn name(&self) -> &str {
            "stalling"
        }

        async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerationError> {
            if request.task == GenerationTask::DraftPosts {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            Ok("done".to_string())
        }
    }

    fn segment(index: usize, text: &str) -> Segment {
        Segment {
            index,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_three_calls_per_segment() {
        let model = Arc::new(CountingModel::default());
        let processor = SegmentProcessor::new(model.clone(), PromptBuilder::default(), 10, None);

        let result = processor.process(segment(1, "public hearing")).await;
        assert_eq!(model.calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.summary.unwrap(), "Summarize");
        assert_eq!(result.compliance_report.unwrap(), "ComplianceAnalyze");
        assert_eq!(result.draft_posts.unwrap(), "DraftPosts");
    }

    #[tokio::test]
    async fn test_empty_segment_skips_backend() {
        let model = Arc::new(CountingModel::default());
        let processor = SegmentProcessor::new(model.clone(), PromptBuilder::default(), 10, None);

        let result = processor.process(segment(2, "")).await;
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
        assert_eq!(result.index, 2);
        for task in GenerationTask::ALL {
            let err = result.outcome(task).as_ref().unwrap_err();
            assert_eq!(err.kind, GenerationErrorKind::EmptyInput);
            assert_eq!(err.message, "empty input");
        }
    }

    #[tokio::test]
    async fn test_timeout_only_affects_slow_call() {
        let processor = SegmentProcessor::new(
            Arc::new(StallingModel),
            PromptBuilder::default(),
            10,
            Some(Duration::from_millis(50)),
        );

        let result = processor.process(segment(1, "agenda item")).await;
        assert_eq!(result.summary.as_deref(), Ok("done"));
        assert_eq!(result.compliance_report.as_deref(), Ok("done"));
        assert_eq!(result.draft_posts.unwrap_err().kind, GenerationErrorKind::Timeout);
    }

    #[tokio::test]
    async fn test_dummy_round_trip() {
        let processor = SegmentProcessor::new(Arc::new(DummyModel::new()), PromptBuilder::default(), 1, None);
        let result = processor.process(segment(1, "a b")).await;
        assert_eq!(result.summary.as_deref(), Ok("Summarize:a b"));
        assert_eq!(result.draft_posts.as_deref(), Ok("DraftPosts:a b"));
    }
}
