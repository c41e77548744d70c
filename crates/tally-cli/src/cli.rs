use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tally_core::ResolveChoice;

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Back up and sync Tally budget data")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the local data store
    #[arg(long, global = true, value_name = "PATH")]
    pub store: Option<PathBuf>,

    /// Keep the backup in a local directory instead of the cloud drive
    #[arg(long, global = true, value_name = "DIR")]
    pub remote_dir: Option<PathBuf>,

    /// Drive access token (defaults to TALLY_ACCESS_TOKEN)
    #[arg(long, global = true, value_name = "TOKEN")]
    pub token: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sync local data with the backup file
    Sync {
        /// How to resolve a conflict without prompting
        #[arg(long, value_enum, value_name = "CHOICE")]
        on_conflict: Option<ConflictChoice>,
    },
    /// Show local sync state and the remote backup
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect or edit local data buckets
    Bucket {
        #[command(subcommand)]
        command: BucketCommands,
    },
    /// Sync periodically until interrupted
    Watch,
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum BucketCommands {
    /// List buckets and their sizes
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a bucket's raw content
    Get {
        /// Bucket name (e.g. expenses)
        name: String,
    },
    /// Replace a bucket's content with JSON (stdin when omitted or `-`)
    Set {
        /// Bucket name (e.g. expenses)
        name: String,
        /// JSON content
        value: Option<String>,
    },
    /// Delete a bucket
    Remove {
        /// Bucket name (e.g. expenses)
        name: String,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ConflictChoice {
    KeepLocal,
    KeepRemote,
    Merge,
}

impl From<ConflictChoice> for ResolveChoice {
    fn from(value: ConflictChoice) -> Self {
        match value {
            ConflictChoice::KeepLocal => Self::KeepLocal,
            ConflictChoice::KeepRemote => Self::KeepRemote,
            ConflictChoice::Merge => Self::Merge,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
