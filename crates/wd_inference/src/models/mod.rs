use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use reqwest::StatusCode;
use tracing::info;
use wd_core::{BackendSelector, Error, GenerationBackend, GenerationError, GenerationErrorKind, Result};

use crate::Config;

pub mod dummy;
pub mod ollama;
pub mod ollama_cli;
pub mod openai;

pub use dummy::DummyModel;
pub use ollama::{OllamaConfig, OllamaModel};
pub use ollama_cli::{OllamaCliConfig, OllamaCliModel};
pub use openai::{OpenAiConfig, OpenAiModel};

pub type ModelFactory = Box<dyn Fn(&Config) -> Result<Arc<dyn GenerationBackend>> + Send + Sync>;

/// Maps selector names to backend constructors.
pub struct ModelRegistry {
    factories: BTreeMap<String, ModelFactory>,
    aliases: BTreeMap<String, String>,
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .field("aliases", &self.aliases)
            .finish()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(BackendSelector::OPENAI, |config| {
            Ok(Arc::new(OpenAiModel::new(config.openai.clone())?) as Arc<dyn GenerationBackend>)
        });
        registry.register(BackendSelector::OLLAMA, |config| {
            Ok(Arc::new(OllamaModel::new(config.ollama.clone())) as Arc<dyn GenerationBackend>)
        });
        registry.register(BackendSelector::OLLAMA_CLI, |config| {
            Ok(Arc::new(OllamaCliModel::new(config.ollama_cli.clone())) as Arc<dyn GenerationBackend>)
        });
        registry.register(BackendSelector::DUMMY, |_| {
            Ok(Arc::new(DummyModel::new()) as Arc<dyn GenerationBackend>)
        });

        registry.alias("gpt-4o-mini", BackendSelector::OPENAI);
        registry.alias("llama3.1", BackendSelector::OLLAMA);
        registry
    }
}

impl ModelRegistry {
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
            aliases: BTreeMap::new(),
        }
    }

    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&Config) -> Result<Arc<dyn GenerationBackend>> + Send + Sync + 'static,
    {
        let key = BackendSelector::new(name).as_str().to_string();
        self.factories.insert(key, Box::new(factory));
    }

    pub fn alias(&mut self, alias: &str, target: &str) {
        self.aliases.insert(
            BackendSelector::new(alias).as_str().to_string(),
            BackendSelector::new(target).as_str().to_string(),
        );
    }

    /// Registered selector names, aliases excluded.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn aliases_of(&self, name: &str) -> Vec<&str> {
        self.aliases
            .iter()
            .filter(|(_, target)| target.as_str() == name)
            .map(|(alias, _)| alias.as_str())
            .collect()
    }

    /// The registered name `selector` points at, with aliases followed.
    pub fn canonical_name<'a>(&'a self, selector: &'a BackendSelector) -> &'a str {
        self.aliases
            .get(selector.as_str())
            .map(String::as_str)
            .unwrap_or_else(|| selector.as_str())
    }

    pub fn resolve(&self, selector: &BackendSelector, config: &Config) -> Result<Arc<dyn GenerationBackend>> {
        let name = self.canonical_name(selector);

        let factory = self.factories.get(name).ok_or_else(|| {
            Error::Input(format!(
                "unknown backend `{}` (available: {})",
                selector,
                self.names().join(", ")
            ))
        })?;

        let model = factory(config)?;
        info!("🧠 Backend resolved: {} -> {}", selector, model.name());
        Ok(model)
    }
}

/// Resolves `selector` through the default registry.
pub fn create_model(selector: &BackendSelector, config: &Config) -> Result<Arc<dyn GenerationBackend>> {
    ModelRegistry::default().resolve(selector, config)
}

pub(crate) fn transport_error(backend: &str, err: reqwest::Error) -> GenerationError {
    let kind = if err.is_timeout() {
        GenerationErrorKind::Timeout
    } else if err.is_decode() {
        GenerationErrorKind::MalformedResponse
    } else {
        GenerationErrorKind::Unavailable
    };
    GenerationError::new(kind, format!("{} request failed: {}", backend, err))
}

pub(crate) fn status_error(backend: &str, status: StatusCode, body: &str) -> GenerationError {
    let kind = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GenerationErrorKind::Authentication,
        StatusCode::TOO_MANY_REQUESTS => GenerationErrorKind::RateLimited,
        _ => GenerationErrorKind::Status,
    };
    let body = body.trim();
    let message = if body.is_empty() {
        format!("{} returned {}", backend, status)
    } else {
        format!("{} returned {}: {}", backend, status, body)
    };
    GenerationError::new(kind, message)
}

pub(crate) fn non_empty(backend: &str, text: &str) -> std::result::Result<String, GenerationError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(GenerationError::new(
            GenerationErrorKind::EmptyOutput,
            format!("{} returned an empty completion", backend),
        ));
    }
    Ok(text.to_string())
}

#[cfg(test)]
pub(crate) mod test_server {
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves the same canned HTTP response to every connection and records
    /// the request bodies it received.
    pub async fn serve(status: u16, body: &'static str) -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else { break };
                let seen = seen.clone();
                tokio::spawn(async move {
                    let request = read_request(&mut socket).await;
                    seen.lock().unwrap().push(request);
                    let response = format!(
                        "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        (addr, requests)
    }

    /// An address nothing listens on.
    pub async fn closed_addr() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return String::from_utf8_lossy(&buf[end + 4..end + 4 + length]).to_string();
                }
            }
        }
        String::new()
    }
}
