//! Sync pass orchestration.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

use super::backup::BackupClient;
use super::collector::{apply, collect};
use super::detector::{classify, Direction};
use super::resolver::{resolve, Resolution};
use crate::models::{ConflictRecord, ResolveChoice};
use crate::remote::RemoteStore;
use crate::state::SyncPhase;
use crate::storage::{LocalData, LocalStore};
use crate::{Error, Result};

/// Result of one sync pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Local state was pushed; `initial` when no backup existed before.
    Uploaded { initial: bool },
    /// Remote state replaced local buckets.
    Downloaded,
    /// Both sides changed; nothing was touched and the user must choose.
    Conflict(ConflictRecord),
}

/// Owns the local data gateway and the backup client, and makes sure only
/// one pass runs at a time.
#[derive(Debug)]
pub struct SyncEngine<S, R> {
    local: LocalData<S>,
    backup: BackupClient<R>,
    in_flight: AtomicBool,
    phase: watch::Sender<SyncPhase>,
}

impl<S: LocalStore, R: RemoteStore> SyncEngine<S, R> {
    pub fn new(local: LocalData<S>, backup: BackupClient<R>) -> Self {
        let (phase, _) = watch::channel(SyncPhase::Idle);
        Self {
            local,
            backup,
            in_flight: AtomicBool::new(false),
            phase,
        }
    }

    pub const fn local(&self) -> &LocalData<S> {
        &self.local
    }

    pub const fn backup(&self) -> &BackupClient<R> {
        &self.backup
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> SyncPhase {
        *self.phase.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncPhase> {
        self.phase.subscribe()
    }

    pub(crate) fn set_phase(&self, phase: SyncPhase) {
        self.phase.send_replace(phase);
    }

    /// Run one sync pass: download, classify, then upload, download, or
    /// report a conflict.
    pub async fn sync_now(&self, token: &str) -> Result<SyncOutcome> {
        let _guard = InFlight::acquire(&self.in_flight)?;
        self.set_phase(SyncPhase::Syncing);

        let result = self.run_pass(token).await;
        self.finish(result.is_ok());
        result
    }

    /// Resolve a conflict returned by [`SyncEngine::sync_now`].
    pub async fn resolve(
        &self,
        choice: ResolveChoice,
        conflict: &ConflictRecord,
        token: &str,
    ) -> Result<Resolution> {
        let _guard = InFlight::acquire(&self.in_flight)?;
        self.set_phase(SyncPhase::Syncing);

        let result = resolve(&self.local, &self.backup, choice, &conflict.remote, token).await;
        self.finish(result.is_ok());
        result
    }

    async fn run_pass(&self, token: &str) -> Result<SyncOutcome> {
        let remote = self.backup.download(token).await;
        let state = self.local.sync_state()?;
        let dirty = state.is_dirty();
        let direction = classify(remote.as_ref(), state.last_sync, dirty);
        tracing::debug!(
            "Sync direction {:?} (last_sync={:?}, dirty={dirty})",
            direction,
            state.last_sync
        );

        match (direction, remote) {
            (Direction::MergeConflict, Some(remote)) => {
                tracing::info!(
                    "Sync conflict: remote from device {} at {} and unsynced local changes",
                    remote.device_id,
                    remote.timestamp
                );
                let local = collect(&self.local)?;
                Ok(SyncOutcome::Conflict(ConflictRecord { remote, local }))
            }
            (Direction::Download, Some(remote)) => {
                apply(&self.local, &remote)?;
                tracing::info!("Applied backup from device {}", remote.device_id);
                Ok(SyncOutcome::Downloaded)
            }
            (direction, _) => {
                self.backup.upload(&self.local, token).await?;
                Ok(SyncOutcome::Uploaded {
                    initial: direction == Direction::NoRemote,
                })
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn hold_in_flight(&self) -> impl Sized + '_ {
        InFlight::acquire(&self.in_flight).expect("in-flight flag should be free")
    }

    fn finish(&self, succeeded: bool) {
        self.set_phase(if succeeded {
            SyncPhase::Synced
        } else {
            SyncPhase::Error
        });
    }
}

struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::SyncInProgress)?;
        Ok(Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    use super::*;
    use crate::models::{BucketKey, Snapshot};
    use crate::storage::{JsonFileStore, MemoryStore};
    use crate::sync::testing::MemoryRemote;

    const FILE: &str = "tally-backup.json";

    fn engine() -> SyncEngine<MemoryStore, MemoryRemote> {
        SyncEngine::new(
            LocalData::new(MemoryStore::new()),
            BackupClient::with_file_name(MemoryRemote::new(), FILE),
        )
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 1, hour, 0, 0).unwrap()
    }

    fn bucket_json(engine: &SyncEngine<MemoryStore, MemoryRemote>, key: BucketKey) -> Value {
        let raw = engine.local().read_bucket(key).unwrap().unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[tokio::test]
    async fn first_sync_without_backup_uploads_initial_snapshot() {
        let engine = engine();
        engine
            .local()
            .write_bucket(BucketKey::Categories, r#"[{"id":"c1"}]"#)
            .unwrap();

        let outcome = engine.sync_now("token").await.unwrap();
        assert_eq!(outcome, SyncOutcome::Uploaded { initial: true });

        let uploaded = engine.backup().remote().snapshot(FILE).unwrap();
        assert_eq!(uploaded.bucket(BucketKey::Categories), Some(r#"[{"id":"c1"}]"#));
        assert_eq!(engine.phase(), SyncPhase::Synced);
        assert!(!engine.local().sync_state().unwrap().is_dirty());
    }

    #[tokio::test]
    async fn steady_state_passes_upload_identical_data() {
        let engine = engine();
        engine.local().write_bucket(BucketKey::Notes, "[]").unwrap();

        engine.sync_now("token").await.unwrap();
        let first = engine.backup().remote().snapshot(FILE).unwrap();

        let outcome = engine.sync_now("token").await.unwrap();
        assert_eq!(outcome, SyncOutcome::Uploaded { initial: false });
        let second = engine.backup().remote().snapshot(FILE).unwrap();

        assert_eq!(first.data, second.data);
        assert_eq!(engine.backup().remote().write_count(), 2);
    }

    #[tokio::test]
    async fn newer_remote_with_clean_local_downloads() {
        let engine = engine();
        engine
            .local()
            .restore_bucket(BucketKey::Jars, r#"[{"id":"j1"}]"#)
            .unwrap();
        engine.local().record_sync(at(10)).unwrap();

        let mut remote = Snapshot::new(at(12), "phone");
        remote.set_bucket(BucketKey::Jars, r#"[{"id":"j1"},{"id":"j2"}]"#);
        engine.backup().remote().put_snapshot(FILE, &remote);

        let outcome = engine.sync_now("token").await.unwrap();
        assert_eq!(outcome, SyncOutcome::Downloaded);
        assert_eq!(
            bucket_json(&engine, BucketKey::Jars),
            json!([{"id": "j1"}, {"id": "j2"}])
        );
        assert_eq!(engine.local().sync_state().unwrap().last_sync, Some(at(12)));
        assert_eq!(engine.backup().remote().write_count(), 0);
    }

    #[tokio::test]
    async fn concurrent_edits_merge_end_to_end() {
        let engine = engine();
        let local = engine.local();

        // Synced at T1, edited at T2, another device uploaded at T3.
        local
            .restore_bucket(BucketKey::Expenses, r#"[{"id":"e1"}]"#)
            .unwrap();
        local.record_sync(at(10)).unwrap();
        local
            .write_bucket(BucketKey::Expenses, r#"[{"id":"e1","amount":12}]"#)
            .unwrap();
        local.mark_changed_at(at(11)).unwrap();

        let mut remote = Snapshot::new(at(12), "phone");
        remote.set_bucket(BucketKey::Expenses, r#"[{"id":"e1"},{"id":"e2"}]"#);
        engine.backup().remote().put_snapshot(FILE, &remote);

        let SyncOutcome::Conflict(conflict) = engine.sync_now("token").await.unwrap() else {
            panic!("expected a conflict");
        };
        assert_eq!(conflict.remote, remote);
        assert_eq!(
            conflict.local.bucket(BucketKey::Expenses),
            Some(r#"[{"id":"e1","amount":12}]"#)
        );
        assert_eq!(engine.backup().remote().write_count(), 0);

        let resolution = engine
            .resolve(ResolveChoice::Merge, &conflict, "token")
            .await
            .unwrap();
        assert_eq!(resolution, Resolution::Merged);

        let merged = bucket_json(&engine, BucketKey::Expenses);
        assert_eq!(merged, json!([{"id": "e1", "amount": 12}, {"id": "e2"}]));

        let uploaded = engine.backup().remote().snapshot(FILE).unwrap();
        let uploaded_expenses: Value =
            serde_json::from_str(uploaded.bucket(BucketKey::Expenses).unwrap()).unwrap();
        assert_eq!(uploaded_expenses, merged);
        assert!(!engine.local().sync_state().unwrap().is_dirty());
    }

    #[tokio::test]
    async fn pass_picks_up_edits_made_through_another_store_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let engine = SyncEngine::new(
            LocalData::new(JsonFileStore::open(&path).unwrap()),
            BackupClient::with_file_name(MemoryRemote::new(), FILE),
        );
        engine.sync_now("token").await.unwrap();

        let editor = LocalData::new(JsonFileStore::open(&path).unwrap());
        editor
            .write_bucket(BucketKey::Expenses, r#"[{"id":"e1"}]"#)
            .unwrap();

        let outcome = engine.sync_now("token").await.unwrap();
        assert_eq!(outcome, SyncOutcome::Uploaded { initial: false });

        let reopened = LocalData::new(JsonFileStore::open(&path).unwrap());
        assert_eq!(
            reopened.read_bucket(BucketKey::Expenses).unwrap().as_deref(),
            Some(r#"[{"id":"e1"}]"#)
        );
        let uploaded = engine.backup().remote().snapshot(FILE).unwrap();
        assert_eq!(uploaded.bucket(BucketKey::Expenses), Some(r#"[{"id":"e1"}]"#));
    }

    #[tokio::test]
    async fn failed_upload_reports_error_phase() {
        let engine = engine();
        engine.local().write_bucket(BucketKey::Notes, "[]").unwrap();
        engine.backup().remote().fail_writes(true);

        let mut phases = engine.subscribe();
        assert!(engine.sync_now("token").await.is_err());
        assert_eq!(*phases.borrow_and_update(), SyncPhase::Error);
        assert!(!engine.is_in_flight());
    }

    #[tokio::test]
    async fn unreachable_remote_is_treated_as_missing_backup() {
        let engine = engine();
        engine.backup().remote().fail_reads(true);

        let outcome = engine.sync_now("token").await.unwrap();
        assert_eq!(outcome, SyncOutcome::Uploaded { initial: true });
    }

    #[tokio::test]
    async fn overlapping_pass_is_rejected() {
        let engine = engine();
        let _held = InFlight::acquire(&engine.in_flight).unwrap();

        let err = engine.sync_now("token").await.unwrap_err();
        assert!(matches!(err, Error::SyncInProgress));
        assert!(engine.is_in_flight());
    }
}
