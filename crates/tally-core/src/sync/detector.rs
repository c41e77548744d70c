//! Sync direction classification.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::Snapshot;

/// What a sync pass should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Push local state to the backup
    Upload,
    /// Remote is newer and local is clean; overwrite local silently
    Download,
    /// Both sides changed since the last reconciliation
    MergeConflict,
    /// No backup yet; local becomes the initial backup
    NoRemote,
}

/// Classify a sync pass from the remote snapshot and local bookkeeping.
///
/// `last_sync` of `None` compares as epoch zero and never yields a conflict.
/// When local is at least as current as remote the answer is `Upload`, even
/// if nothing changed anywhere.
pub fn classify(
    remote: Option<&Snapshot>,
    last_sync: Option<DateTime<Utc>>,
    local_dirty: bool,
) -> Direction {
    let Some(remote) = remote else {
        return Direction::NoRemote;
    };

    let local_time = last_sync.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    let remote_newer = remote.timestamp > local_time;

    if remote_newer && local_dirty && last_sync.is_some() {
        Direction::MergeConflict
    } else if remote_newer {
        Direction::Download
    } else {
        Direction::Upload
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn snapshot_at(hour: u32) -> Snapshot {
        Snapshot::new(Utc.with_ymd_and_hms(2024, 7, 1, hour, 0, 0).unwrap(), "remote")
    }

    fn at(hour: u32) -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(2024, 7, 1, hour, 0, 0).unwrap())
    }

    #[test]
    fn missing_remote_is_no_remote() {
        assert_eq!(classify(None, None, false), Direction::NoRemote);
        assert_eq!(classify(None, at(5), true), Direction::NoRemote);
    }

    #[test]
    fn newer_remote_with_dirty_local_conflicts() {
        let remote = snapshot_at(12);
        assert_eq!(classify(Some(&remote), at(10), true), Direction::MergeConflict);
        assert_eq!(classify(Some(&remote), at(10), false), Direction::Download);
    }

    #[test]
    fn first_sync_never_conflicts() {
        let remote = snapshot_at(12);
        assert_eq!(classify(Some(&remote), None, true), Direction::Download);
    }

    #[test]
    fn local_at_least_as_current_uploads() {
        let remote = snapshot_at(10);
        assert_eq!(classify(Some(&remote), at(10), false), Direction::Upload);
        assert_eq!(classify(Some(&remote), at(11), true), Direction::Upload);
        assert_eq!(classify(Some(&remote), at(11), false), Direction::Upload);
    }
}
