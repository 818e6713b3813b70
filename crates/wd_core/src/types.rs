use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::GenerationError;
use crate::{Error, Result};

pub const UNKNOWN_DATE: &str = "Unknown_Date";
pub const UNKNOWN_TITLE: &str = "Unknown Title";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GenerationTask {
    Summarize,
    ComplianceAnalyze,
    DraftPosts,
}

impl GenerationTask {
    pub const ALL: [GenerationTask; 3] = [
        GenerationTask::Summarize,
        GenerationTask::ComplianceAnalyze,
        GenerationTask::DraftPosts,
    ];

    /// Prefix used when a failed call is written into a record slot.
    pub fn failure_label(self) -> &'static str {
        match self {
            Self::Summarize => "Error summarizing transcript",
            Self::ComplianceAnalyze => "Error analyzing content",
            Self::DraftPosts => "Error generating Nextdoor posts",
        }
    }
}

impl fmt::Display for GenerationTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Summarize => "Summarize",
            Self::ComplianceAnalyze => "ComplianceAnalyze",
            Self::DraftPosts => "DraftPosts",
        };
        f.write_str(name)
    }
}

/// One word-bounded slice of a transcript. `index` starts at 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub index: usize,
    pub text: String,
}

impl Segment {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceMetadata {
    pub title: String,
    pub upload_date: Option<NaiveDate>,
}

impl SourceMetadata {
    pub fn new(title: impl Into<String>, upload_date: Option<NaiveDate>) -> Self {
        let title = title.into();
        let title = if title.trim().is_empty() {
            UNKNOWN_TITLE.to_string()
        } else {
            title.trim().to_string()
        };
        Self { title, upload_date }
    }

    pub fn date_label(&self) -> String {
        self.upload_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| UNKNOWN_DATE.to_string())
    }
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp such as the `uploadDate`
/// meta value of a video page.
pub fn parse_upload_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() || raw == UNKNOWN_DATE {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

/// The transcript and its metadata, as handed over by the input supplier.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub metadata: SourceMetadata,
    pub transcript: String,
}

impl SourceDocument {
    pub fn new(metadata: SourceMetadata, transcript: impl Into<String>) -> Self {
        Self {
            metadata,
            transcript: transcript.into(),
        }
    }
}

pub type GenerationOutcome = std::result::Result<String, GenerationError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentResult {
    pub index: usize,
    pub summary: GenerationOutcome,
    pub compliance_report: GenerationOutcome,
    pub draft_posts: GenerationOutcome,
}

impl SegmentResult {
    /// Result for a segment whose every call failed the same way.
    pub fn failed(index: usize, error: GenerationError) -> Self {
        Self {
            index,
            summary: Err(error.clone()),
            compliance_report: Err(error.clone()),
            draft_posts: Err(error),
        }
    }

    pub fn outcome(&self, task: GenerationTask) -> &GenerationOutcome {
        match task {
            GenerationTask::Summarize => &self.summary,
            GenerationTask::ComplianceAnalyze => &self.compliance_report,
            GenerationTask::DraftPosts => &self.draft_posts,
        }
    }

    pub fn error_count(&self) -> usize {
        GenerationTask::ALL
            .iter()
            .filter(|task| self.outcome(**task).is_err())
            .count()
    }
}

/// Registry key naming one generation backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackendSelector(String);

impl BackendSelector {
    pub const OPENAI: &'static str = "openai";
    pub const OLLAMA: &'static str = "ollama";
    pub const OLLAMA_CLI: &'static str = "ollama-cli";
    pub const DUMMY: &'static str = "dummy";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().trim().to_lowercase())
    }

    pub fn openai() -> Self {
        Self::new(Self::OPENAI)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for BackendSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Err(Error::Input("no backend selected".to_string()));
        }
        Ok(Self::new(s))
    }
}

impl fmt::Display for BackendSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_label_fallback() {
        let metadata = SourceMetadata::new("Council", None);
        assert_eq!(metadata.date_label(), "Unknown_Date");

        let metadata = SourceMetadata::new("Council", NaiveDate::from_ymd_opt(2024, 9, 3));
        assert_eq!(metadata.date_label(), "2024-09-03");
    }

    #[test]
    fn test_blank_title_defaults() {
        assert_eq!(SourceMetadata::new("   ", None).title, UNKNOWN_TITLE);
        assert_eq!(SourceMetadata::new(" Regular Meeting ", None).title, "Regular Meeting");
    }

    #[test]
    fn test_parse_upload_date() {
        assert_eq!(parse_upload_date("2024-09-03"), NaiveDate::from_ymd_opt(2024, 9, 3));
        assert_eq!(
            parse_upload_date("2024-09-03T10:15:00-07:00"),
            NaiveDate::from_ymd_opt(2024, 9, 3)
        );
        assert_eq!(parse_upload_date("Unknown_Date"), None);
        assert_eq!(parse_upload_date("last tuesday"), None);
    }

    #[test]
    fn test_backend_selector_normalizes() {
        let selector: BackendSelector = " OpenAI ".parse().unwrap();
        assert_eq!(selector.as_str(), "openai");
        assert!("".parse::<BackendSelector>().is_err());
    }

    #[test]
    fn test_segment_result_error_count() {
        let mut result = SegmentResult::failed(1, GenerationError::empty_input());
        assert_eq!(result.error_count(), 3);
        result.summary = Ok("fine".to_string());
        assert_eq!(result.error_count(), 2);
    }
}
