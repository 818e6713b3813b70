use std::fmt;
use wd_core::{GenerationBackend, GenerationError, GenerationRequest};

/// Offline backend answering `<Task>:<segment>` for every request.
#[derive(Default)]
pub struct DummyModel;

impl fmt::Debug for DummyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyModel").finish()
    }
}

impl DummyModel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl GenerationBackend for DummyModel {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerationError> {
        Ok(format!("{}:{}", request.task, request.segment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wd_core::{build_prompt, GenerationTask};

    #[tokio::test]
    async fn test_dummy_model() {
        let model = DummyModel::new();

        let request = build_prompt(GenerationTask::Summarize, "a b");
        assert_eq!(model.generate(&request).await.unwrap(), "Summarize:a b");

        let request = build_prompt(GenerationTask::ComplianceAnalyze, "c d");
        assert_eq!(model.generate(&request).await.unwrap(), "ComplianceAnalyze:c d");

        assert!(model.health_check().await.is_ok());
    }
}
