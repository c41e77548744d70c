//! Sync conflict model

use serde::{Deserialize, Serialize};

use super::Snapshot;

/// Both sides changed since the last reconciliation.
///
/// Held in memory until the user picks a [`ResolveChoice`]; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictRecord {
    /// Snapshot read from the backup file
    pub remote: Snapshot,
    /// Local snapshot collected when the conflict was detected
    pub local: Snapshot,
}

/// User decision for a detected conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveChoice {
    /// Discard remote changes and upload local state
    KeepLocal,
    /// Overwrite local buckets with the remote snapshot
    KeepRemote,
    /// Merge both sides, local wins on record collisions
    Merge,
}
