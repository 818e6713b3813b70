pub mod json;
pub mod memory;

pub use json::JsonFileStorage;
pub use memory::MemoryStorage;
