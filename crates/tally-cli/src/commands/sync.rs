use std::io::{self, BufRead, IsTerminal, Write};

use tally_core::config::BackupConfig;
use tally_core::sync::{Resolution, SyncOutcome};
use tally_core::{ConflictRecord, ResolveChoice};

use crate::cli::ConflictChoice;
use crate::commands::common::{open_engine, resolve_token, CliContext};
use crate::error::CliError;

pub async fn run_sync(
    context: &CliContext,
    on_conflict: Option<ConflictChoice>,
) -> Result<(), CliError> {
    let config = BackupConfig::from_env()?;
    let engine = open_engine(context, &config)?;
    let token = resolve_token(context)?;

    let outcome = engine
        .sync_now(&token)
        .await
        .map_err(|error| CliError::SyncFailed(error.to_string()))?;

    let conflict = match outcome {
        SyncOutcome::Conflict(conflict) => conflict,
        other => {
            println!("{}", describe_outcome(&other));
            return Ok(());
        }
    };

    let choice = match on_conflict {
        Some(choice) => choice.into(),
        None => prompt_conflict_choice(&conflict)?,
    };
    let resolution = engine
        .resolve(choice, &conflict, &token)
        .await
        .map_err(|error| CliError::SyncFailed(error.to_string()))?;
    println!("{}", describe_resolution(resolution));
    Ok(())
}

pub fn describe_outcome(outcome: &SyncOutcome) -> String {
    match outcome {
        SyncOutcome::Uploaded { initial: true } => "Created the first backup".to_string(),
        SyncOutcome::Uploaded { initial: false } => "Backup updated".to_string(),
        SyncOutcome::Downloaded => "Local data updated from backup".to_string(),
        SyncOutcome::Conflict(conflict) => format!(
            "Conflict with backup from device {}",
            conflict.remote.device_id
        ),
    }
}

pub const fn describe_resolution(resolution: Resolution) -> &'static str {
    match resolution {
        Resolution::Uploaded => "Kept local data and replaced the backup",
        Resolution::Downloaded => "Replaced local data with the backup",
        Resolution::Merged => "Merged local data with the backup",
    }
}

/// Map a prompt answer to a choice; anything unrecognized dismisses the conflict.
pub fn parse_conflict_answer(input: &str) -> Option<ResolveChoice> {
    match input.trim().to_ascii_lowercase().as_str() {
        "l" | "local" | "keep-local" => Some(ResolveChoice::KeepLocal),
        "r" | "remote" | "keep-remote" => Some(ResolveChoice::KeepRemote),
        "m" | "merge" => Some(ResolveChoice::Merge),
        _ => None,
    }
}

fn prompt_conflict_choice(conflict: &ConflictRecord) -> Result<ResolveChoice, CliError> {
    if !io::stdin().is_terminal() {
        return Err(CliError::UnresolvedConflict);
    }

    println!("Both this device and the backup changed since the last sync.");
    println!(
        "  Backup: device {} at {}",
        conflict.remote.device_id,
        conflict.remote.timestamp.to_rfc3339()
    );
    println!(
        "  Local:  device {} with {} buckets",
        conflict.local.device_id,
        conflict.local.populated_buckets().count()
    );
    print!("Keep [l]ocal, keep [r]emote, [m]erge, or anything else to cancel: ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    parse_conflict_answer(&answer).ok_or(CliError::UnresolvedConflict)
}
