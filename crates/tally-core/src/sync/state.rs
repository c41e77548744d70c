//! Persisted sync bookkeeping.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::storage::LocalStore;
use crate::util::parse_timestamp;
use crate::Result;

pub(crate) const LAST_SYNC_KEY: &str = "sync.last_sync_at";
pub(crate) const LAST_LOCAL_CHANGE_KEY: &str = "sync.last_local_change_at";
pub(crate) const DEVICE_ID_KEY: &str = "sync.device_id";

/// Sync timestamps and device identity as stored on this device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncState {
    /// Most recent successful upload or download
    pub last_sync: Option<DateTime<Utc>>,
    /// Most recent local mutation
    pub last_local_change: Option<DateTime<Utc>>,
    /// Identifier of this device, created on first collection
    pub device_id: Option<String>,
}

impl SyncState {
    pub fn load(store: &impl LocalStore) -> Result<Self> {
        Ok(Self {
            last_sync: load_timestamp(store, LAST_SYNC_KEY)?,
            last_local_change: load_timestamp(store, LAST_LOCAL_CHANGE_KEY)?,
            device_id: store.get(DEVICE_ID_KEY)?,
        })
    }

    /// Local data changed after the last successful sync.
    ///
    /// A device that never synced is dirty as soon as anything changed.
    pub fn is_dirty(&self) -> bool {
        match (self.last_local_change, self.last_sync) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(changed), Some(synced)) => changed > synced,
        }
    }
}

pub(crate) fn store_timestamp(
    store: &impl LocalStore,
    key: &str,
    at: DateTime<Utc>,
) -> Result<()> {
    store.set(key, &at.to_rfc3339())
}

fn load_timestamp(store: &impl LocalStore, key: &str) -> Result<Option<DateTime<Utc>>> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    let parsed = parse_timestamp(&raw);
    if parsed.is_none() {
        tracing::warn!("Ignoring unparsable sync timestamp {key}={raw:?}");
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::storage::MemoryStore;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn dirty_requires_change_after_last_sync() {
        let mut state = SyncState::default();
        assert!(!state.is_dirty());

        state.last_local_change = Some(at(9));
        assert!(state.is_dirty());

        state.last_sync = Some(at(10));
        assert!(!state.is_dirty());

        state.last_local_change = Some(at(10));
        assert!(!state.is_dirty());

        state.last_local_change = Some(at(11));
        assert!(state.is_dirty());
    }

    #[test]
    fn load_reads_persisted_keys() {
        let store = MemoryStore::new();
        store_timestamp(&store, LAST_SYNC_KEY, at(8)).unwrap();
        store.set(LAST_LOCAL_CHANGE_KEY, "garbage").unwrap();
        store.set(DEVICE_ID_KEY, "device-1").unwrap();

        let state = SyncState::load(&store).unwrap();
        assert_eq!(state.last_sync, Some(at(8)));
        assert_eq!(state.last_local_change, None);
        assert_eq!(state.device_id.as_deref(), Some("device-1"));
    }
}
