pub mod coordinator;
pub mod processor;

pub use coordinator::{run_pipeline, Pipeline};
pub use processor::SegmentProcessor;
