//! Backup synchronization between local buckets and the remote backup file.
//!
//! A pass downloads the remote snapshot, classifies it against local sync
//! state, then uploads, downloads, or reports a conflict for the user to
//! resolve.

mod backup;
mod collector;
mod detector;
mod engine;
mod resolver;
mod scheduler;
pub(crate) mod state;
#[cfg(test)]
mod testing;

pub use backup::BackupClient;
pub use collector::{apply, collect};
pub use detector::{classify, Direction};
pub use engine::{SyncEngine, SyncOutcome};
pub use resolver::{merge_into_local, merge_records, resolve, Resolution};
pub use scheduler::{SchedulerConfig, SyncScheduler};
pub use state::SyncState;
