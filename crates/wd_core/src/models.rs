use async_trait::async_trait;
use std::fmt;

use crate::error::GenerationError;
use crate::prompts::GenerationRequest;
use crate::Result;

#[async_trait]
pub trait GenerationBackend: Send + Sync + fmt::Debug {
    /// Human readable adapter name used in logs
    fn name(&self) -> &str;

    /// Check that the backend can be reached before any work is dispatched
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    /// Run one prompt through the backend and return the trimmed text.
    ///
    /// Implementations must tolerate concurrent calls on a shared instance.
    async fn generate(&self, request: &GenerationRequest<'_>) -> std::result::Result<String, GenerationError>;
}
