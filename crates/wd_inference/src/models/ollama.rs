use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;
use wd_core::{Error, GenerationBackend, GenerationError, GenerationErrorKind, GenerationRequest, Result};

use super::{non_empty, status_error, transport_error};

pub const DEFAULT_MODEL_URL: &str = "http://localhost:11434/llama3.1";
const DEFAULT_PORT: u16 = 11434;
const DEFAULT_MODEL: &str = "llama3.1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OllamaConfig {
    pub host: String,
    pub port: u16,
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost".to_string(),
            port: DEFAULT_PORT,
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl OllamaConfig {
    /// Parses `scheme://host[:port][/model]`, e.g. `http://gpu-box:11434/llama3.1:70b`.
    pub fn from_model_url(model_url: &str) -> Result<Self> {
        let parsed = Url::parse(model_url)?;
        let host = parsed
            .host_str()
            .ok_or_else(|| Error::Config(format!("model URL `{}` has no host", model_url)))?;
        let model = parsed.path().trim_matches('/');

        Ok(Self {
            host: format!("{}://{}", parsed.scheme(), host),
            port: parsed.port().unwrap_or(DEFAULT_PORT),
            model: if model.is_empty() {
                DEFAULT_MODEL.to_string()
            } else {
                model.to_string()
            },
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    num_predict: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

/// Locally hosted Ollama server reached over HTTP.
pub struct OllamaModel {
    client: Arc<Client>,
    config: OllamaConfig,
}

impl fmt::Debug for OllamaModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OllamaModel")
            .field("client", &"<reqwest::Client>")
            .field("endpoint", &self.config.endpoint())
            .field("model", &self.config.model)
            .finish()
    }
}

impl OllamaModel {
    pub fn new(config: OllamaConfig) -> Self {
        Self {
            client: Arc::new(Client::new()),
            config,
        }
    }
}

#[async_trait]
impl GenerationBackend for OllamaModel {
    fn name(&self) -> &str {
        "Ollama"
    }

    async fn health_check(&self) -> Result<()> {
        let url = format!("{}/api/tags", self.config.endpoint());
        let response = self.client.get(&url).send().await.map_err(|e| {
            Error::BackendUnavailable(format!(
                "Ollama is not available at {}: {}. Please ensure Ollama is running and the model '{}' is installed.",
                self.config.endpoint(),
                e,
                self.config.model
            ))
        })?;

        if !response.status().is_success() {
            return Err(Error::BackendResponse(format!(
                "Ollama at {} answered {}",
                self.config.endpoint(),
                response.status()
            )));
        }
        Ok(())
    }

    async fn generate(&self, request: &GenerationRequest<'_>) -> std::result::Result<String, GenerationError> {
        let body = GenerateRequest {
            model: &self.config.model,
            prompt: &request.prompt,
            stream: false,
            options: GenerateOptions {
                num_predict: request.max_tokens,
                temperature: request.temperature,
            },
        };

        debug!("📡 POST {}/api/generate ({})", self.config.endpoint(), request.task);
        let response = self
            .client
            .post(format!("{}/api/generate", self.config.endpoint()))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(self.name(), e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(self.name(), status, &text));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            GenerationError::new(
                GenerationErrorKind::MalformedResponse,
                format!("Ollama response could not be decoded: {}", e),
            )
        })?;

        let text = parsed.response.ok_or_else(|| {
            GenerationError::new(GenerationErrorKind::MalformedResponse, "Ollama response is missing `response`")
        })?;
        non_empty(self.name(), &text)
    }
}
