use chrono::Utc;
use tally_core::config::BackupConfig;
use tally_core::BucketKey;

use crate::commands::common::{
    format_status_lines, open_engine, resolve_token, CliContext, RemoteStatus, StatusReport,
};
use crate::error::CliError;

pub async fn run_status(context: &CliContext, as_json: bool) -> Result<(), CliError> {
    let config = BackupConfig::from_env()?;
    let engine = open_engine(context, &config)?;
    let local = engine.local();

    let mut buckets = Vec::new();
    for key in BucketKey::ALL {
        if local.read_bucket(key)?.is_some() {
            buckets.push(key.as_str().to_string());
        }
    }

    let mut report = StatusReport::new(&context.store_path, &local.sync_state()?, buckets);
    if let Ok(token) = resolve_token(context) {
        report.signed_in = true;
        report.remote = engine
            .backup()
            .download(&token)
            .await
            .as_ref()
            .map(RemoteStatus::from);
    }

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in format_status_lines(&report, Utc::now()) {
            println!("{line}");
        }
    }
    Ok(())
}
