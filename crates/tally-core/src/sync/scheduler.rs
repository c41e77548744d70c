//! Periodic background sync.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::engine::{SyncEngine, SyncOutcome};
use crate::config::BackupConfig;
use crate::models::ConflictRecord;
use crate::remote::RemoteStore;
use crate::state::SyncPhase;
use crate::storage::LocalStore;
use crate::Error;

/// Timing of the background loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Time between passes
    pub interval: Duration,
    /// Wait before the first pass, so sign-in does not race initial data load
    pub initial_delay: Duration,
}

impl From<&BackupConfig> for SchedulerConfig {
    fn from(config: &BackupConfig) -> Self {
        Self {
            interval: config.sync_interval,
            initial_delay: config.auto_sync_delay,
        }
    }
}

/// Single repeating sync task tied to a signed-in session.
///
/// Start it on sign-in and stop it on sign-out. Dropping the scheduler
/// aborts the task.
#[derive(Debug)]
pub struct SyncScheduler {
    shutdown: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl SyncScheduler {
    /// Spawn the loop on the current tokio runtime.
    ///
    /// Conflicts found by a tick are never resolved automatically; they are
    /// forwarded to `conflicts` when provided.
    pub fn start<S, R>(
        engine: Arc<SyncEngine<S, R>>,
        token: String,
        config: SchedulerConfig,
        conflicts: Option<mpsc::Sender<ConflictRecord>>,
    ) -> Self
    where
        S: LocalStore + 'static,
        R: RemoteStore + 'static,
    {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        tracing::info!(
            "Starting periodic sync every {}s",
            config.interval.as_secs()
        );

        let handle = tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(config.initial_delay) => {}
                _ = shutdown_rx.changed() => {
                    engine.set_phase(SyncPhase::Offline);
                    return;
                }
            }

            let mut ticker = tokio::time::interval(config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => run_tick(&engine, &token, conflicts.as_ref()).await,
                    _ = shutdown_rx.changed() => break,
                }
            }

            engine.set_phase(SyncPhase::Offline);
            tracing::info!("Periodic sync stopped");
        });

        Self {
            shutdown,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Signal the loop to exit and wait for it. A pass already running is
    /// allowed to finish.
    pub async fn stop(mut self) {
        self.shutdown.send_replace(true);
        if let Some(handle) = self.handle.take() {
            if let Err(error) = handle.await {
                tracing::warn!("Periodic sync task ended abnormally: {error}");
            }
        }
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn run_tick<S: LocalStore, R: RemoteStore>(
    engine: &SyncEngine<S, R>,
    token: &str,
    conflicts: Option<&mpsc::Sender<ConflictRecord>>,
) {
    if engine.is_in_flight() {
        tracing::debug!("Skipping periodic sync: a pass is already running");
        return;
    }

    match engine.sync_now(token).await {
        Ok(SyncOutcome::Conflict(conflict)) => {
            tracing::warn!(
                "Periodic sync found a conflict with device {}; waiting for user choice",
                conflict.remote.device_id
            );
            if let Some(sender) = conflicts {
                if let Err(error) = sender.try_send(conflict) {
                    tracing::debug!("Conflict not forwarded: {error}");
                }
            }
        }
        Ok(outcome) => tracing::debug!("Periodic sync finished: {outcome:?}"),
        Err(Error::SyncInProgress) => {
            tracing::debug!("Skipping periodic sync: a pass is already running");
        }
        Err(error) => tracing::error!("Periodic sync failed: {error}"),
    }
}
