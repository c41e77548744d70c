use std::env;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tally_core::config::BackupConfig;
use tally_core::remote::{DriveClient, FsRemoteStore, RemoteStore};
use tally_core::storage::{JsonFileStore, LocalData};
use tally_core::sync::{BackupClient, SyncEngine, SyncState};
use tally_core::util::{format_relative_time, normalize_text_option};
use tally_core::{BucketKey, Snapshot};

use crate::error::CliError;

const TOKEN_ENV: &str = "TALLY_ACCESS_TOKEN";
const STORE_FILE_NAME: &str = "local-store.json";
const LOCAL_REMOTE_TOKEN: &str = "local";

pub type CliEngine = SyncEngine<JsonFileStore, CliRemote>;

/// Options shared by every command.
#[derive(Debug, Clone)]
pub struct CliContext {
    pub store_path: PathBuf,
    pub remote_dir: Option<PathBuf>,
    pub token: Option<String>,
}

impl CliContext {
    pub fn new(store: Option<PathBuf>, remote_dir: Option<PathBuf>, token: Option<String>) -> Self {
        Self {
            store_path: store.unwrap_or_else(default_store_path),
            remote_dir,
            token,
        }
    }
}

/// Backup target selected on the command line.
#[derive(Debug, Clone)]
pub enum CliRemote {
    Drive(DriveClient),
    Directory(FsRemoteStore),
}

impl RemoteStore for CliRemote {
    async fn find_file(&self, token: &str, name: &str) -> tally_core::Result<Option<String>> {
        match self {
            Self::Drive(remote) => remote.find_file(token, name).await,
            Self::Directory(remote) => remote.find_file(token, name).await,
        }
    }

    async fn read_file(&self, token: &str, file_id: &str) -> tally_core::Result<String> {
        match self {
            Self::Drive(remote) => remote.read_file(token, file_id).await,
            Self::Directory(remote) => remote.read_file(token, file_id).await,
        }
    }

    async fn create_file(&self, token: &str, name: &str, body: &str) -> tally_core::Result<String> {
        match self {
            Self::Drive(remote) => remote.create_file(token, name, body).await,
            Self::Directory(remote) => remote.create_file(token, name, body).await,
        }
    }

    async fn update_file(&self, token: &str, file_id: &str, body: &str) -> tally_core::Result<()> {
        match self {
            Self::Drive(remote) => remote.update_file(token, file_id, body).await,
            Self::Directory(remote) => remote.update_file(token, file_id, body).await,
        }
    }
}

pub fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tally")
        .join(STORE_FILE_NAME)
}

pub fn open_local(store_path: &Path) -> Result<LocalData<JsonFileStore>, CliError> {
    Ok(LocalData::new(JsonFileStore::open(store_path)?))
}

pub fn open_engine(context: &CliContext, config: &BackupConfig) -> Result<CliEngine, CliError> {
    let remote = match &context.remote_dir {
        Some(dir) => CliRemote::Directory(FsRemoteStore::new(dir)),
        None => CliRemote::Drive(DriveClient::new(config)?),
    };
    tracing::debug!("Using local store {}", context.store_path.display());

    Ok(SyncEngine::new(
        open_local(&context.store_path)?,
        BackupClient::with_file_name(remote, &config.backup_file_name),
    ))
}

/// Token from `--token`, then the environment. A directory remote needs none.
pub fn resolve_token(context: &CliContext) -> Result<String, CliError> {
    if let Some(token) = normalize_text_option(context.token.clone()) {
        return Ok(token);
    }
    if let Some(token) = normalize_text_option(env::var(TOKEN_ENV).ok()) {
        return Ok(token);
    }
    if context.remote_dir.is_some() {
        return Ok(LOCAL_REMOTE_TOKEN.to_string());
    }
    Err(CliError::MissingToken)
}

pub fn parse_bucket_key(name: &str) -> Result<BucketKey, CliError> {
    name.parse::<BucketKey>().map_err(|_| {
        let known = BucketKey::ALL
            .iter()
            .map(|key| key.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        CliError::UnknownBucket(name.trim().to_string(), known)
    })
}

#[derive(Debug, Serialize)]
pub struct RemoteStatus {
    pub timestamp: DateTime<Utc>,
    pub device_id: String,
    pub buckets: usize,
}

impl From<&Snapshot> for RemoteStatus {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            timestamp: snapshot.timestamp,
            device_id: snapshot.device_id.clone(),
            buckets: snapshot.populated_buckets().count(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub store_path: String,
    pub device_id: Option<String>,
    pub last_sync: Option<DateTime<Utc>>,
    pub last_local_change: Option<DateTime<Utc>>,
    pub dirty: bool,
    pub buckets: Vec<String>,
    pub signed_in: bool,
    pub remote: Option<RemoteStatus>,
}

impl StatusReport {
    pub fn new(store_path: &Path, state: &SyncState, buckets: Vec<String>) -> Self {
        Self {
            store_path: store_path.display().to_string(),
            device_id: state.device_id.clone(),
            last_sync: state.last_sync,
            last_local_change: state.last_local_change,
            dirty: state.is_dirty(),
            buckets,
            signed_in: false,
            remote: None,
        }
    }
}

pub fn format_status_lines(report: &StatusReport, now: DateTime<Utc>) -> Vec<String> {
    let describe = |at: Option<DateTime<Utc>>| {
        at.map_or_else(
            || "never".to_string(),
            |at| format!("{} ({})", at.to_rfc3339(), format_relative_time(at, now)),
        )
    };

    let mut lines = vec![
        format!("Store:        {}", report.store_path),
        format!(
            "Device:       {}",
            report.device_id.as_deref().unwrap_or("(not assigned yet)")
        ),
        format!("Last sync:    {}", describe(report.last_sync)),
        format!("Last change:  {}", describe(report.last_local_change)),
        format!(
            "Local data:   {}",
            if report.dirty {
                "unsynced changes"
            } else {
                "up to date"
            }
        ),
        format!(
            "Buckets:      {}",
            if report.buckets.is_empty() {
                "(none)".to_string()
            } else {
                report.buckets.join(", ")
            }
        ),
    ];

    let remote_line = match (&report.remote, report.signed_in) {
        (Some(remote), _) => format!(
            "Backup:       synced by device {} at {} ({} buckets)",
            remote.device_id,
            describe(Some(remote.timestamp)),
            remote.buckets
        ),
        (None, true) => "Backup:       none found".to_string(),
        (None, false) => "Backup:       not signed in".to_string(),
    };
    lines.push(remote_line);
    lines
}
