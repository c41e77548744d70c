//! tally-core - Core library for Tally
//!
//! This crate holds the local bucket store, the backup snapshot model, and
//! the synchronization subsystem that reconciles local buckets with a single
//! backup file kept in a cloud drive's application folder.

pub mod config;
pub mod error;
pub mod models;
pub mod remote;
pub mod state;
pub mod storage;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{BucketContent, BucketKey, ConflictRecord, ResolveChoice, Snapshot};
pub use state::SyncPhase;
