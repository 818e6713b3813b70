use std::fmt;
use std::io::ErrorKind;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;
use wd_core::{Error, GenerationBackend, GenerationError, GenerationErrorKind, GenerationRequest, Result};

use super::non_empty;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OllamaCliConfig {
    pub binary: String,
    pub model: String,
}

impl Default for OllamaCliConfig {
    fn default() -> Self {
        Self {
            binary: "ollama".to_string(),
            model: "llama3.1".to_string(),
        }
    }
}

/// Runs the model through a local executable, one process per call.
pub struct OllamaCliModel {
    config: OllamaCliConfig,
}

impl fmt::Debug for OllamaCliModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OllamaCliModel")
            .field("binary", &self.config.binary)
            .field("model", &self.config.model)
            .finish()
    }
}

impl OllamaCliModel {
    pub fn new(config: OllamaCliConfig) -> Self {
        Self { config }
    }

    fn command(&self, request: &GenerationRequest<'_>) -> Command {
        let mut command = Command::new(&self.config.binary);
        command
            .arg("run")
            .arg(&self.config.model)
            .arg("--text")
            .arg(&request.prompt)
            .arg("--max-tokens")
            .arg(request.max_tokens.to_string())
            .arg("--temperature")
            .arg(request.temperature.to_string())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl GenerationBackend for OllamaCliModel {
    fn name(&self) -> &str {
        "Ollama CLI"
    }

    async fn health_check(&self) -> Result<()> {
        let status = Command::new(&self.config.binary)
            .arg("--version")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::BackendUnavailable(format!("cannot run `{}`: {}", self.config.binary, e)))?
            .status;
        if !status.success() {
            return Err(Error::BackendUnavailable(format!(
                "`{} --version` exited with {}",
                self.config.binary, status
            )));
        }
        Ok(())
    }

    async fn generate(&self, request: &GenerationRequest<'_>) -> std::result::Result<String, GenerationError> {
        debug!("🖥️ {} run {} ({})", self.config.binary, self.config.model, request.task);
        let output = self.command(request).output().await.map_err(|e| {
            let message = if e.kind() == ErrorKind::NotFound {
                format!("`{}` was not found on PATH", self.config.binary)
            } else {
                format!("failed to run `{}`: {}", self.config.binary, e)
            };
            GenerationError::new(GenerationErrorKind::Unavailable, message)
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GenerationError::new(
                GenerationErrorKind::Status,
                format!("`{}` exited with {}: {}", self.config.binary, output.status, stderr.trim()),
            ));
        }

        non_empty(self.name(), &String::from_utf8_lossy(&output.stdout))
    }
}
