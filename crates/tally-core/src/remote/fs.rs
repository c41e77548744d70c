//! Directory-backed remote for offline backups.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;

use super::RemoteStore;
use crate::{Error, Result};

/// Remote store that keeps files in a local directory.
///
/// File identifiers are the file names. Tokens are accepted and ignored.
#[derive(Clone, Debug)]
pub struct FsRemoteStore {
    root: PathBuf,
}

impl FsRemoteStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        let name = name.trim();
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains('/')
            || name.contains('\\')
        {
            return Err(Error::InvalidInput(format!(
                "invalid remote file name '{name}'"
            )));
        }
        Ok(self.root.join(name))
    }
}

impl RemoteStore for FsRemoteStore {
    async fn find_file(&self, _token: &str, name: &str) -> Result<Option<String>> {
        let path = self.path_for(name)?;
        Ok(is_file(&path).await?.then(|| name.trim().to_string()))
    }

    async fn read_file(&self, _token: &str, file_id: &str) -> Result<String> {
        let path = self.path_for(file_id)?;
        Ok(fs::read_to_string(path).await?)
    }

    async fn create_file(&self, _token: &str, name: &str, body: &str) -> Result<String> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.root).await?;
        fs::write(path, body).await?;
        Ok(name.trim().to_string())
    }

    async fn update_file(&self, _token: &str, file_id: &str, body: &str) -> Result<()> {
        let path = self.path_for(file_id)?;
        if !is_file(&path).await? {
            return Err(Error::Remote(format!("file not found: {file_id}")));
        }
        fs::write(path, body).await?;
        Ok(())
    }
}

async fn is_file(path: &Path) -> Result<bool> {
    match fs::metadata(path).await {
        Ok(metadata) => Ok(metadata.is_file()),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(false),
        Err(error) => Err(error.into()),
    }
}
