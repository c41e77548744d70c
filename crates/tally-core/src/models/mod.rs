//! Data models for Tally

mod bucket;
mod snapshot;
mod sync_conflict;

pub use bucket::{BucketContent, BucketKey, Record, RecordKey};
pub use snapshot::{Snapshot, SNAPSHOT_VERSION};
pub use sync_conflict::{ConflictRecord, ResolveChoice};
