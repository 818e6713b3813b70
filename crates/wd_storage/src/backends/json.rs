use async_trait::async_trait;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::path::PathBuf;
use tracing::{debug, info};
use wd_core::{AggregateRecord, Error, RecordStorage, Result};

use crate::{StorageBackend, DEFAULT_OUTPUT_DIR};

/// One pretty-printed JSON file per record, named
/// `<upload_date>_<video_title>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    root: PathBuf,
}

impl JsonFileStorage {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Like [`JsonFileStorage::with_root`] but creates the directory up front.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let storage = Self::with_root(root);
        storage.ensure_root().await?;
        Ok(storage)
    }

    pub fn path_for(&self, record: &AggregateRecord) -> PathBuf {
        self.root.join(record.file_name())
    }

    async fn ensure_root(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            Error::Storage(format!(
                "{} ({}): {}",
                Self::get_error_message(),
                self.root.display(),
                e
            ))
        })
    }

    /// Keys are looked up in the output directory first, then taken as a path.
    async fn resolve(&self, key: &str) -> PathBuf {
        let in_root = self.root.join(key);
        if tokio::fs::try_exists(&in_root).await.unwrap_or(false) {
            return in_root;
        }
        let as_given = PathBuf::from(key);
        if tokio::fs::try_exists(&as_given).await.unwrap_or(false) {
            as_given
        } else {
            in_root
        }
    }
}

/// Four-space indentation, non-ASCII kept verbatim.
fn to_pretty_json(record: &AggregateRecord) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    record.serialize(&mut serializer)?;
    Ok(out)
}

#[async_trait]
impl StorageBackend for JsonFileStorage {
    fn get_error_message() -> &'static str {
        "Output directory should be writable"
    }

    async fn new() -> Result<Self> where Self: Sized {
        Self::open(DEFAULT_OUTPUT_DIR).await
    }
}

#[async_trait]
impl RecordStorage for JsonFileStorage {
    async fn store_record(&self, record: &AggregateRecord) -> Result<String> {
        self.ensure_root().await?;
        let path = self.path_for(record);
        tokio::fs::write(&path, to_pretty_json(record)?).await?;
        info!("💾 Record saved to {}", path.display());
        Ok(path.display().to_string())
    }

    async fn load_record(&self, key: &str) -> Result<AggregateRecord> {
        let path = self.resolve(key).await;
        debug!("📂 Loading record from {}", path.display());
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| Error::Storage(format!("cannot read {}: {}", path.display(), e)))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn list_records(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                keys.push(path.display().to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;
    use wd_core::{assemble, SegmentResult, SourceMetadata};

    fn record(title: &str) -> AggregateRecord {
        let results: BTreeMap<usize, SegmentResult> = (1..=2)
            .map(|i| {
                (
                    i,
                    SegmentResult {
                        index: i,
                        summary: Ok(format!("- Punto {}", i)),
                        compliance_report: Ok("None found.".to_string()),
                        draft_posts: Ok("The council met on Tuesday.".to_string()),
                    },
                )
            })
            .collect();
        assemble(
            &SourceMetadata::new(title, NaiveDate::from_ymd_opt(2024, 9, 3)),
            "a b c d",
            &results,
        )
    }

    #[tokio::test]
    async fn test_store_creates_directory_and_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("processed_transcriptions");
        let storage = JsonFileStorage::with_root(&root);

        let key = storage.store_record(&record("City Council – Sept")).await.unwrap();
        assert_eq!(key, root.join("2024-09-03_City Council – Sept.json").display().to_string());

        let raw = std::fs::read_to_string(&key).unwrap();
        assert!(raw.contains("\n    \"video_title\": \"City Council – Sept\""));
        assert!(raw.contains("\"part_1\": \"- Punto 1\""));
    }

    #[tokio::test]
    async fn test_load_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::open(dir.path()).await.unwrap();
        assert!(storage.list_records().await.unwrap().is_empty());

        let original = record("Budget Workshop");
        storage.store_record(&original).await.unwrap();
        storage.store_record(&record("Regular Meeting")).await.unwrap();

        let keys = storage.list_records().await.unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys[0].ends_with("2024-09-03_Budget Workshop.json"));

        let by_name = storage.load_record("2024-09-03_Budget Workshop.json").await.unwrap();
        assert_eq!(by_name, original);
        let by_path = storage.load_record(&keys[0]).await.unwrap();
        assert_eq!(by_path, original);
    }

    #[tokio::test]
    async fn test_output_directory_wins_over_working_directory() {
        let root = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::open(root.path()).await.unwrap();

        // Same relative key under the output directory and under the working directory.
        let local = tempfile::tempdir_in(".").unwrap();
        let rel = local.path().file_name().unwrap().to_str().unwrap().to_string();
        let key = format!("{}/2024-09-03_Budget Workshop.json", rel);

        let in_root = record("Budget Workshop");
        std::fs::create_dir_all(root.path().join(&rel)).unwrap();
        std::fs::write(root.path().join(&key), to_pretty_json(&in_root).unwrap()).unwrap();
        std::fs::write(&key, to_pretty_json(&record("Stray Copy")).unwrap()).unwrap();

        assert_eq!(storage.load_record(&key).await.unwrap(), in_root);
    }

    #[tokio::test]
    async fn test_missing_record() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::with_root(dir.path());
        assert!(matches!(
            storage.load_record("nope.json").await,
            Err(Error::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_list_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::with_root(dir.path().join("absent"));
        assert!(storage.list_records().await.unwrap().is_empty());
    }
}
