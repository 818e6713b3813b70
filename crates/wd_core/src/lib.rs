pub mod error;
pub mod models;
pub mod partition;
pub mod prompts;
pub mod record;
pub mod storage;
pub mod types;

pub use error::{Error, ErrorCategory, GenerationError, GenerationErrorKind};
pub use models::GenerationBackend;
pub use partition::partition;
pub use prompts::{build_prompt, GenerationRequest, PromptBuilder};
pub use record::{assemble, AggregateRecord};
pub use storage::RecordStorage;
pub use types::{
    parse_upload_date, BackendSelector, GenerationOutcome, GenerationTask, Segment, SegmentResult,
    SourceDocument, SourceMetadata,
};

pub type Result<T> = std::result::Result<T, Error>;
