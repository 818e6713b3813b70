use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Input error: {0}")]
    Input(String),

    #[error("Partition error: {0}")]
    Partition(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Backend response error: {0}")]
    BackendResponse(String),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

/// Coarse classification shared by pipeline-level and per-call failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Partition,
    BackendUnavailable,
    BackendResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationErrorKind {
    /// The segment had no words, so no backend call was made.
    EmptyInput,
    Authentication,
    RateLimited,
    /// Transport or process failure before any response was produced.
    Unavailable,
    /// Non-success HTTP status or non-zero process exit.
    Status,
    MalformedResponse,
    EmptyOutput,
    Timeout,
    /// The task running the call died without producing a value.
    Internal,
}

impl GenerationErrorKind {
    pub fn category(self) -> ErrorCategory {
        match self {
            Self::EmptyInput => ErrorCategory::Input,
            Self::Unavailable | Self::Timeout | Self::Internal => ErrorCategory::BackendUnavailable,
            Self::Authentication
            | Self::RateLimited
            | Self::Status
            | Self::MalformedResponse
            | Self::EmptyOutput => ErrorCategory::BackendResponse,
        }
    }
}

impl fmt::Display for GenerationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::EmptyInput => "empty input",
            Self::Authentication => "authentication failure",
            Self::RateLimited => "rate limited",
            Self::Unavailable => "backend unavailable",
            Self::Status => "backend returned an error status",
            Self::MalformedResponse => "malformed response",
            Self::EmptyOutput => "empty output",
            Self::Timeout => "timed out",
            Self::Internal => "internal failure",
        };
        f.write_str(label)
    }
}

/// A failed `generate` call. Carried as data inside a segment result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct GenerationError {
    pub kind: GenerationErrorKind,
    pub message: String,
}

impl GenerationError {
    pub fn new(kind: GenerationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn empty_input() -> Self {
        Self::new(GenerationErrorKind::EmptyInput, "empty input")
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }
}
