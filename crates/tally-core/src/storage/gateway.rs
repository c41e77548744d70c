//! Mutation gateway over the local store.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::LocalStore;
use crate::models::BucketKey;
use crate::sync::state::{
    store_timestamp, SyncState, DEVICE_ID_KEY, LAST_LOCAL_CHANGE_KEY, LAST_SYNC_KEY,
};
use crate::Result;

/// Local bucket access that keeps the dirty flag honest.
///
/// Every user edit must go through [`LocalData::write_bucket`] or
/// [`LocalData::remove_bucket`], which stamp the last-local-change instant.
/// Writes made by the sync layer itself use `restore_bucket` and leave it
/// untouched.
#[derive(Debug)]
pub struct LocalData<S> {
    store: S,
}

impl<S: LocalStore> LocalData<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub fn read_bucket(&self, key: BucketKey) -> Result<Option<String>> {
        self.store.get(key.as_str())
    }

    /// Replace a bucket's content as a user edit.
    pub fn write_bucket(&self, key: BucketKey, value: &str) -> Result<()> {
        self.store.set(key.as_str(), value)?;
        self.mark_changed()
    }

    /// Delete a bucket as a user edit.
    pub fn remove_bucket(&self, key: BucketKey) -> Result<()> {
        self.store.remove(key.as_str())?;
        self.mark_changed()
    }

    /// Record that local data changed now.
    pub fn mark_changed(&self) -> Result<()> {
        self.mark_changed_at(Utc::now())
    }

    pub fn mark_changed_at(&self, at: DateTime<Utc>) -> Result<()> {
        store_timestamp(&self.store, LAST_LOCAL_CHANGE_KEY, at)
    }

    pub fn sync_state(&self) -> Result<SyncState> {
        SyncState::load(&self.store)
    }

    /// Persisted device identifier, generated on first use.
    pub fn device_id(&self) -> Result<String> {
        if let Some(existing) = self.store.get(DEVICE_ID_KEY)? {
            if !existing.trim().is_empty() {
                return Ok(existing);
            }
        }

        let device_id = Uuid::now_v7().to_string();
        self.store.set(DEVICE_ID_KEY, &device_id)?;
        tracing::debug!("Generated device id {device_id}");
        Ok(device_id)
    }

    pub fn record_sync(&self, at: DateTime<Utc>) -> Result<()> {
        store_timestamp(&self.store, LAST_SYNC_KEY, at)
    }

    pub(crate) fn restore_bucket(&self, key: BucketKey, value: &str) -> Result<()> {
        self.store.set(key.as_str(), value)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn write_bucket_marks_data_dirty() {
        let local = LocalData::new(MemoryStore::new());
        local
            .record_sync(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap())
            .unwrap();
        assert!(!local.sync_state().unwrap().is_dirty());

        local.write_bucket(BucketKey::Jars, "[]").unwrap();
        assert_eq!(local.read_bucket(BucketKey::Jars).unwrap().as_deref(), Some("[]"));
        assert!(local.sync_state().unwrap().is_dirty());
    }

    #[test]
    fn remove_bucket_marks_data_dirty() {
        let local = LocalData::new(MemoryStore::new());
        local.restore_bucket(BucketKey::Notes, "[]").unwrap();
        assert!(!local.sync_state().unwrap().is_dirty());

        local.remove_bucket(BucketKey::Notes).unwrap();
        assert_eq!(local.read_bucket(BucketKey::Notes).unwrap(), None);
        assert!(local.sync_state().unwrap().is_dirty());
    }

    #[test]
    fn device_id_is_generated_once() {
        let local = LocalData::new(MemoryStore::new());
        let first = local.device_id().unwrap();
        let second = local.device_id().unwrap();
        assert_eq!(first, second);
        assert_eq!(local.sync_state().unwrap().device_id, Some(first));
    }
}
