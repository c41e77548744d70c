//! Device-local storage for buckets and sync bookkeeping.

mod gateway;
mod local;

pub use gateway::LocalData;
pub use local::{JsonFileStore, LocalStore, MemoryStore};
