//! Reads and writes the single backup file through a [`RemoteStore`].

use chrono::Utc;

use super::collector::collect;
use crate::config::DEFAULT_BACKUP_FILE_NAME;
use crate::models::Snapshot;
use crate::remote::RemoteStore;
use crate::storage::{LocalData, LocalStore};
use crate::Result;

/// Client for the well-known backup file.
#[derive(Debug, Clone)]
pub struct BackupClient<R> {
    remote: R,
    file_name: String,
}

impl<R: RemoteStore> BackupClient<R> {
    pub fn new(remote: R) -> Self {
        Self::with_file_name(remote, DEFAULT_BACKUP_FILE_NAME)
    }

    pub fn with_file_name(remote: R, file_name: impl Into<String>) -> Self {
        Self {
            remote,
            file_name: file_name.into(),
        }
    }

    pub const fn remote(&self) -> &R {
        &self.remote
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Identifier of the backup file, `None` when absent or unreachable.
    pub async fn find_backup(&self, token: &str) -> Option<String> {
        match self.remote.find_file(token, &self.file_name).await {
            Ok(found) => found,
            Err(error) => {
                tracing::warn!("Backup lookup for {} failed: {}", self.file_name, error);
                None
            }
        }
    }

    /// Upload a freshly collected local snapshot, creating the file if needed.
    ///
    /// On success the last-sync instant becomes now and the uploaded
    /// snapshot is returned.
    pub async fn upload<S: LocalStore>(
        &self,
        local: &LocalData<S>,
        token: &str,
    ) -> Result<Snapshot> {
        let snapshot = collect(local)?;
        let payload = snapshot.to_json()?;

        let result = match self.find_backup(token).await {
            Some(file_id) => self.remote.update_file(token, &file_id, &payload).await,
            None => self
                .remote
                .create_file(token, &self.file_name, &payload)
                .await
                .map(|file_id| {
                    tracing::info!("Created backup file {file_id}");
                }),
        };
        if let Err(error) = result {
            tracing::error!("Backup upload failed: {}", error);
            return Err(error);
        }

        local.record_sync(Utc::now())?;
        tracing::info!(
            "Uploaded backup with {} buckets from device {}",
            snapshot.populated_buckets().count(),
            snapshot.device_id
        );
        Ok(snapshot)
    }

    /// Fetch and decode the backup.
    ///
    /// Missing files, transport failures, and malformed content all yield
    /// `None`.
    pub async fn download(&self, token: &str) -> Option<Snapshot> {
        let file_id = self.find_backup(token).await?;

        let payload = match self.remote.read_file(token, &file_id).await {
            Ok(payload) => payload,
            Err(error) => {
                tracing::error!("Backup download failed for {file_id}: {}", error);
                return None;
            }
        };

        match Snapshot::from_json(&payload) {
            Ok(snapshot) => {
                tracing::debug!(
                    "Downloaded backup from device {} at {}",
                    snapshot.device_id,
                    snapshot.timestamp
                );
                Some(snapshot)
            }
            Err(error) => {
                tracing::error!("Backup file {file_id} is not a valid snapshot: {}", error);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::BucketKey;
    use crate::remote::FsRemoteStore;
    use crate::storage::MemoryStore;

    fn fixture() -> (tempfile::TempDir, BackupClient<FsRemoteStore>, LocalData<MemoryStore>) {
        let dir = tempfile::tempdir().unwrap();
        let backup = BackupClient::new(FsRemoteStore::new(dir.path()));
        let local = LocalData::new(MemoryStore::new());
        (dir, backup, local)
    }

    #[tokio::test]
    async fn download_without_backup_is_none() {
        let (_dir, backup, _local) = fixture();
        assert_eq!(backup.find_backup("token").await, None);
        assert_eq!(backup.download("token").await, None);
    }

    #[tokio::test]
    async fn upload_creates_then_updates_the_same_file() {
        let (dir, backup, local) = fixture();
        local.write_bucket(BucketKey::Expenses, r#"[{"id":"e1"}]"#).unwrap();

        let first = backup.upload(&local, "token").await.unwrap();
        let second = backup.upload(&local, "token").await.unwrap();
        assert_eq!(first.data, second.data);

        let files = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(files, 1);

        let downloaded = backup.download("token").await.unwrap();
        assert_eq!(downloaded, second);
        assert!(!local.sync_state().unwrap().is_dirty());
        assert!(local.sync_state().unwrap().last_sync >= Some(second.timestamp));
    }

    #[tokio::test]
    async fn malformed_backup_downloads_as_none() {
        let (dir, backup, _local) = fixture();
        std::fs::write(dir.path().join(backup.file_name()), "{ not a snapshot").unwrap();
        assert!(backup.find_backup("token").await.is_some());
        assert_eq!(backup.download("token").await, None);
    }

    #[tokio::test]
    async fn failed_upload_leaves_sync_state_alone() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();
        let backup = BackupClient::new(FsRemoteStore::new(&blocker));
        let local = LocalData::new(MemoryStore::new());
        local.write_bucket(BucketKey::Notes, "[]").unwrap();

        assert!(backup.upload(&local, "token").await.is_err());
        let state = local.sync_state().unwrap();
        assert_eq!(state.last_sync, None);
        assert!(state.is_dirty());
    }
}
