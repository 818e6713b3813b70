use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::types::{GenerationOutcome, GenerationTask, SegmentResult, SourceMetadata};

/// The merged result of one pipeline run, in its persisted shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateRecord {
    #[serde(rename = "video_title")]
    pub source_title: String,
    #[serde(rename = "upload_date")]
    pub source_date: String,
    #[serde(rename = "transcript")]
    pub full_text: String,
    #[serde(rename = "summary", with = "parts")]
    pub summary_by_partition: BTreeMap<usize, String>,
    #[serde(rename = "Legal_and_ethical_flag", with = "parts")]
    pub compliance_by_partition: BTreeMap<usize, String>,
    #[serde(rename = "Next_door", with = "parts")]
    pub posts_by_partition: BTreeMap<usize, String>,
}

impl AggregateRecord {
    pub fn partition_count(&self) -> usize {
        self.summary_by_partition.len()
    }

    /// `<upload_date>_<video_title>.json`, with path separators in the title
    /// replaced so the record always lands directly under its directory.
    pub fn file_name(&self) -> String {
        let title: String = self
            .source_title
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
            .collect();
        format!("{}_{}.json", self.source_date, title)
    }

    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Maps index-keyed segment results onto an [`AggregateRecord`]. Failed calls
/// are rendered as error text in their slot.
pub fn assemble(
    metadata: &SourceMetadata,
    full_text: &str,
    results: &BTreeMap<usize, SegmentResult>,
) -> AggregateRecord {
    let column = |task: GenerationTask| -> BTreeMap<usize, String> {
        results
            .iter()
            .map(|(index, result)| (*index, render(task, result.outcome(task))))
            .collect()
    };

    AggregateRecord {
        source_title: metadata.title.clone(),
        source_date: metadata.date_label(),
        full_text: full_text.to_string(),
        summary_by_partition: column(GenerationTask::Summarize),
        compliance_by_partition: column(GenerationTask::ComplianceAnalyze),
        posts_by_partition: column(GenerationTask::DraftPosts),
    }
}

fn render(task: GenerationTask, outcome: &GenerationOutcome) -> String {
    match outcome {
        Ok(text) => text.clone(),
        Err(e) => format!("{}: {}", task.failure_label(), e),
    }
}

/// `{ "part_1": .., "part_2": .. }` in numeric order.
mod parts {
    use super::*;

    const PREFIX: &str = "part_";

    pub fn serialize<S>(map: &BTreeMap<usize, String>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut out = serializer.serialize_map(Some(map.len()))?;
        for (index, value) in map {
            out.serialize_entry(&format!("{}{}", PREFIX, index), value)?;
        }
        out.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<usize, String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(PartsVisitor)
    }

    struct PartsVisitor;

    impl<'de> Visitor<'de> for PartsVisitor {
        type Value = BTreeMap<usize, String>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map with part_<n> keys")
        }

        fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut map = BTreeMap::new();
            while let Some((key, value)) = access.next_entry::<String, String>()? {
                let index = key
                    .strip_prefix(PREFIX)
                    .and_then(|n| n.parse::<usize>().ok())
                    .ok_or_else(|| de::Error::custom(format!("unexpected partition key `{}`", key)))?;
                map.insert(index, value);
            }
            Ok(map)
        }
    }
}
