//! Backup sync configuration.
//!
//! Values come from environment variables with defaults that target the
//! Google Drive v3 API and its application data folder.

use std::env;
use std::time::Duration;

use crate::util::{is_http_url, normalize_text_option};
use crate::{Error, Result};

const ENV_DRIVE_API_URL: &str = "TALLY_DRIVE_API_URL";
const ENV_DRIVE_UPLOAD_URL: &str = "TALLY_DRIVE_UPLOAD_URL";
const ENV_BACKUP_FILE_NAME: &str = "TALLY_BACKUP_FILE_NAME";
const ENV_SYNC_INTERVAL_SECS: &str = "TALLY_SYNC_INTERVAL_SECS";
const ENV_AUTO_SYNC_DELAY_SECS: &str = "TALLY_AUTO_SYNC_DELAY_SECS";

pub const DEFAULT_DRIVE_API_URL: &str = "https://www.googleapis.com/drive/v3";
pub const DEFAULT_DRIVE_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3";
pub const DEFAULT_BACKUP_FILE_NAME: &str = "tally-backup.json";
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 5 * 60;
pub const DEFAULT_AUTO_SYNC_DELAY_SECS: u64 = 2;

/// Remote drive endpoints and sync timing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackupConfig {
    /// Metadata API base (search, read).
    pub drive_api_url: String,
    /// Upload API base (create, update).
    pub drive_upload_url: String,
    /// Well-known name of the single backup file.
    pub backup_file_name: String,
    /// Period of background sync.
    pub sync_interval: Duration,
    /// Deferral of the first sync after sign-in.
    pub auto_sync_delay: Duration,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            drive_api_url: DEFAULT_DRIVE_API_URL.to_string(),
            drive_upload_url: DEFAULT_DRIVE_UPLOAD_URL.to_string(),
            backup_file_name: DEFAULT_BACKUP_FILE_NAME.to_string(),
            sync_interval: Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS),
            auto_sync_delay: Duration::from_secs(DEFAULT_AUTO_SYNC_DELAY_SECS),
        }
    }
}

impl BackupConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        parse_config(|key| env::var(key).ok())
    }
}

fn parse_config(lookup: impl Fn(&str) -> Option<String>) -> Result<BackupConfig> {
    let defaults = BackupConfig::default();

    let drive_api_url = match normalize_text_option(lookup(ENV_DRIVE_API_URL)) {
        Some(value) => normalize_base_url(&value, ENV_DRIVE_API_URL)?,
        None => defaults.drive_api_url,
    };
    let drive_upload_url = match normalize_text_option(lookup(ENV_DRIVE_UPLOAD_URL)) {
        Some(value) => normalize_base_url(&value, ENV_DRIVE_UPLOAD_URL)?,
        None => defaults.drive_upload_url,
    };
    let backup_file_name = match normalize_text_option(lookup(ENV_BACKUP_FILE_NAME)) {
        Some(value) => normalize_file_name(value)?,
        None => defaults.backup_file_name,
    };

    let sync_interval = match normalize_text_option(lookup(ENV_SYNC_INTERVAL_SECS)) {
        Some(value) => {
            let seconds = parse_seconds(&value, ENV_SYNC_INTERVAL_SECS)?;
            if seconds == 0 {
                return Err(Error::Config(format!(
                    "{ENV_SYNC_INTERVAL_SECS} must be greater than zero"
                )));
            }
            Duration::from_secs(seconds)
        }
        None => defaults.sync_interval,
    };
    let auto_sync_delay = match normalize_text_option(lookup(ENV_AUTO_SYNC_DELAY_SECS)) {
        Some(value) => Duration::from_secs(parse_seconds(&value, ENV_AUTO_SYNC_DELAY_SECS)?),
        None => defaults.auto_sync_delay,
    };

    Ok(BackupConfig {
        drive_api_url,
        drive_upload_url,
        backup_file_name,
        sync_interval,
        auto_sync_delay,
    })
}

fn normalize_base_url(value: &str, field: &str) -> Result<String> {
    if is_http_url(value) {
        Ok(value.trim_end_matches('/').to_string())
    } else {
        Err(Error::Config(format!(
            "{field} must start with http:// or https://"
        )))
    }
}

fn normalize_file_name(value: String) -> Result<String> {
    if value.contains('/') || value.contains('\'') || value.contains('\\') {
        return Err(Error::Config(format!(
            "{ENV_BACKUP_FILE_NAME} must be a plain file name"
        )));
    }
    Ok(value)
}

fn parse_seconds(value: &str, field: &str) -> Result<u64> {
    value
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{field} must be a whole number of seconds")))
}
