use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] tally_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Not signed in. Pass --token or set TALLY_ACCESS_TOKEN.")]
    MissingToken,
    #[error("Unknown bucket '{0}'. Known buckets: {1}")]
    UnknownBucket(String, String),
    #[error("Bucket '{0}' is empty")]
    EmptyBucket(String),
    #[error("Bucket content must be valid JSON: {0}")]
    InvalidBucketValue(String),
    #[error(
        "Sync conflict left unresolved. Re-run with --on-conflict keep-local|keep-remote|merge."
    )]
    UnresolvedConflict,
    #[error("Sync failed: {0}. Please try again.")]
    SyncFailed(String),
}
