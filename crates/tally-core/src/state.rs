//! Shared cross-client state types.

use serde::Serialize;

/// Observable status of the sync engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// No access token; nothing is scheduled.
    Offline,
    /// Signed in, no pass has run yet.
    #[default]
    Idle,
    Syncing,
    Synced,
    Error,
}

impl SyncPhase {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Idle => "idle",
            Self::Syncing => "syncing",
            Self::Synced => "synced",
            Self::Error => "error",
        }
    }
}
