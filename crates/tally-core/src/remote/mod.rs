//! Remote file API used to hold the backup file.

mod drive;
mod fs;

use std::future::Future;

pub use drive::DriveClient;
pub use fs::FsRemoteStore;

use crate::Result;

/// Generic cloud file operations scoped to an application-private folder.
///
/// Authentication is a bearer token owned by the caller.
pub trait RemoteStore: Send + Sync {
    /// Identifier of the most recently modified file named `name`, if any.
    fn find_file(
        &self,
        token: &str,
        name: &str,
    ) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Full content of a file.
    fn read_file(&self, token: &str, file_id: &str) -> impl Future<Output = Result<String>> + Send;

    /// Create a file and return its identifier.
    fn create_file(
        &self,
        token: &str,
        name: &str,
        body: &str,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Replace the content of an existing file.
    fn update_file(
        &self,
        token: &str,
        file_id: &str,
        body: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}
