use async_trait::async_trait;
use crate::record::AggregateRecord;
use crate::Result;

#[async_trait]
pub trait RecordStorage: Send + Sync {
    /// Store a record and return the key (file path for file backends) it was saved under
    async fn store_record(&self, record: &AggregateRecord) -> Result<String>;

    /// Load a previously stored record by key
    async fn load_record(&self, key: &str) -> Result<AggregateRecord>;

    /// List the keys of all stored records
    async fn list_records(&self) -> Result<Vec<String>>;
}
