use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use wd_core::{Error, RecordStorage, Result};

pub mod backends;

pub use backends::*;

pub const DEFAULT_OUTPUT_DIR: &str = "processed_transcriptions";

#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn get_error_message() -> &'static str;
    async fn new() -> Result<Self> where Self: Sized;
}

/// Opens the storage named `kind` (`json` or `memory`). `path` overrides the
/// output directory of file-backed storage.
pub async fn create_storage(kind: &str, path: Option<&str>) -> Result<Arc<dyn RecordStorage>> {
    let storage: Arc<dyn RecordStorage> = match kind {
        "json" => match path {
            Some(root) => Arc::new(JsonFileStorage::open(PathBuf::from(root)).await?),
            None => Arc::new(<JsonFileStorage as StorageBackend>::new().await?),
        },
        "memory" => Arc::new(<MemoryStorage as StorageBackend>::new().await?),
        other => {
            return Err(Error::Config(format!(
                "unknown storage `{}` (expected json or memory)",
                other
            )))
        }
    };
    Ok(storage)
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_storage, StorageBackend};
}
