//! Conflict resolution strategies.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use serde::Serialize;

use super::backup::BackupClient;
use super::collector::{apply, collect};
use crate::models::{BucketContent, Record, RecordKey, ResolveChoice, Snapshot};
use crate::remote::RemoteStore;
use crate::storage::{LocalData, LocalStore};
use crate::Result;

/// What a resolution ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Uploaded,
    Downloaded,
    Merged,
}

/// Apply the user's choice for a conflict with `remote`.
///
/// A failed upload is returned as an error; local writes already made by a
/// merge stay in place.
pub async fn resolve<S: LocalStore, R: RemoteStore>(
    local: &LocalData<S>,
    backup: &BackupClient<R>,
    choice: ResolveChoice,
    remote: &Snapshot,
    token: &str,
) -> Result<Resolution> {
    tracing::info!(
        "Resolving conflict with device {} using {:?}",
        remote.device_id,
        choice
    );

    match choice {
        ResolveChoice::KeepLocal => {
            backup.upload(local, token).await?;
            Ok(Resolution::Uploaded)
        }
        ResolveChoice::KeepRemote => {
            apply(local, remote)?;
            Ok(Resolution::Downloaded)
        }
        ResolveChoice::Merge => {
            merge_into_local(local, remote)?;
            backup.upload(local, token).await?;
            Ok(Resolution::Merged)
        }
    }
}

/// Merge `remote` into local storage without touching the network.
///
/// Remote is applied wholesale first. Then every bucket that existed locally
/// before the merge is revisited: buckets the remote lacks are restored
/// verbatim, and buckets holding record arrays on both sides are merged by
/// identity with local records winning. Any other bucket keeps the remote
/// value.
pub fn merge_into_local<S: LocalStore>(local: &LocalData<S>, remote: &Snapshot) -> Result<()> {
    let before = collect(local)?;
    apply(local, remote)?;

    for (key, local_value) in before.populated_buckets() {
        let Some(remote_value) = remote.bucket(key) else {
            local.restore_bucket(key, local_value)?;
            continue;
        };

        match (
            BucketContent::parse(local_value),
            BucketContent::parse(remote_value),
        ) {
            (BucketContent::Records(local_records), BucketContent::Records(remote_records)) => {
                let merged = merge_records(local_records, remote_records);
                local.restore_bucket(key, &serde_json::to_string(&merged)?)?;
            }
            _ => tracing::debug!("Bucket {key} is not record-shaped on both sides; remote wins"),
        }
    }
    Ok(())
}

/// Union of two record lists keyed by [`RecordKey`], local winning on
/// collision.
///
/// Remote order is kept, a local record replaces its remote twin in place,
/// and local-only records follow in local order.
pub fn merge_records(local: Vec<Record>, remote: Vec<Record>) -> Vec<Record> {
    let mut merged: Vec<Record> = Vec::with_capacity(local.len() + remote.len());
    let mut positions: HashMap<RecordKey, usize> = HashMap::new();

    for record in remote.into_iter().chain(local) {
        match positions.entry(RecordKey::of(&record)) {
            Entry::Occupied(slot) => merged[*slot.get()] = record,
            Entry::Vacant(slot) => {
                slot.insert(merged.len());
                merged.push(record);
            }
        }
    }
    merged
}
