use std::sync::Arc;

use tally_core::config::BackupConfig;
use tally_core::sync::{SchedulerConfig, SyncScheduler};
use tokio::sync::mpsc;

use crate::commands::common::{open_engine, resolve_token, CliContext};
use crate::error::CliError;

pub async fn run_watch(context: &CliContext) -> Result<(), CliError> {
    let config = BackupConfig::from_env()?;
    let token = resolve_token(context)?;
    let engine = Arc::new(open_engine(context, &config)?);
    let scheduler_config = SchedulerConfig::from(&config);

    let (conflict_tx, mut conflict_rx) = mpsc::channel(1);
    let scheduler = SyncScheduler::start(
        Arc::clone(&engine),
        token,
        scheduler_config,
        Some(conflict_tx),
    );
    println!(
        "Syncing every {}s. Press Ctrl-C to stop.",
        scheduler_config.interval.as_secs()
    );

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                break;
            }
            Some(conflict) = conflict_rx.recv() => {
                eprintln!(
                    "Backup from device {} ({}) conflicts with local changes. Run `tally sync --on-conflict <keep-local|keep-remote|merge>` to resolve.",
                    conflict.remote.device_id,
                    conflict.remote.timestamp.to_rfc3339()
                );
            }
        }
    }

    scheduler.stop().await;
    println!("Stopped ({})", engine.phase().label());
    Ok(())
}
