use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use wd_core::{AggregateRecord, Error, RecordStorage, Result};

use crate::StorageBackend;

/// Keeps records in process memory, keyed by their file name.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: BTreeMap<String, AggregateRecord>,
}

impl MemoryStore {
    pub fn store_record(&mut self, record: &AggregateRecord) -> String {
        let key = record.file_name();
        self.records.insert(key.clone(), record.clone());
        key
    }

    pub fn load_record(&self, key: &str) -> Option<AggregateRecord> {
        self.records.get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.records.keys().cloned().collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl MemoryStorage {
    pub async fn new() -> Result<Self> {
        Ok(Self::default())
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    fn get_error_message() -> &'static str {
        "Memory storage should be available"
    }

    async fn new() -> Result<Self> where Self: Sized {
        Self::new().await
    }
}

#[async_trait]
impl RecordStorage for MemoryStorage {
    async fn store_record(&self, record: &AggregateRecord) -> Result<String> {
        let mut store = self.store.write().await;
        Ok(store.store_record(record))
    }

    async fn load_record(&self, key: &str) -> Result<AggregateRecord> {
        let store = self.store.read().await;
        store
            .load_record(key)
            .ok_or_else(|| Error::Storage(format!("no record stored under {}", key)))
    }

    async fn list_records(&self) -> Result<Vec<String>> {
        let store = self.store.read().await;
        Ok(store.keys())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use wd_core::{assemble, GenerationError, SegmentResult, SourceMetadata};

    #[tokio::test]
    async fn test_memory_storage() {
        let results = BTreeMap::from([(1, SegmentResult::failed(1, GenerationError::empty_input()))]);
        let record = assemble(&SourceMetadata::new("Workshop", None), "", &results);

        let storage = MemoryStorage::new().await.unwrap();
        let key = storage.store_record(&record).await.unwrap();
        assert_eq!(key, "Unknown_Date_Workshop.json");

        assert_eq!(storage.list_records().await.unwrap(), vec![key.clone()]);
        assert_eq!(storage.load_record(&key).await.unwrap(), record);
        assert!(storage.load_record("other.json").await.is_err());
    }
}
