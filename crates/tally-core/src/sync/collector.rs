//! Snapshot collection and application.

use chrono::Utc;

use crate::models::{BucketKey, Snapshot};
use crate::storage::{LocalData, LocalStore};
use crate::Result;

/// Gather every populated bucket into a fresh snapshot stamped with now.
///
/// Buckets with no stored value are left out of `data`.
pub fn collect<S: LocalStore>(local: &LocalData<S>) -> Result<Snapshot> {
    let device_id = local.device_id()?;
    let mut snapshot = Snapshot::new(Utc::now(), device_id);
    for key in BucketKey::ALL {
        if let Some(value) = local.read_bucket(key)? {
            snapshot.set_bucket(key, value);
        }
    }
    Ok(snapshot)
}

/// Overwrite local buckets with every non-null bucket in `snapshot`.
///
/// Buckets missing from the snapshot are kept. Names that are not syncable
/// buckets are ignored. The snapshot's timestamp becomes the last-sync
/// instant.
pub fn apply<S: LocalStore>(local: &LocalData<S>, snapshot: &Snapshot) -> Result<()> {
    for (name, value) in &snapshot.data {
        let Some(value) = value else {
            continue;
        };
        match name.parse::<BucketKey>() {
            Ok(key) => local.restore_bucket(key, value)?,
            Err(_) => tracing::debug!("Skipping unknown bucket '{name}' from remote snapshot"),
        }
    }
    local.record_sync(snapshot.timestamp)
}
