//! Upload capability and a local directory store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::types::{LogoError, LogoResult};

/// Object storage for normalized images.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Store PNG bytes under `identifier` and return a public address.
    async fn upload(&self, identifier: &str, png_bytes: Vec<u8>) -> LogoResult<String>;

    /// Remove the object stored under `identifier`.
    async fn delete(&self, identifier: &str) -> LogoResult<()>;
}

/// Writes `<identifier>.png` files into a directory; addresses are `file://` URLs.
#[derive(Debug, Clone)]
pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, identifier: &str) -> LogoResult<PathBuf> {
        if identifier.is_empty() || identifier.contains(['/', '\\']) || identifier.starts_with('.') {
            return Err(LogoError::InvalidInput(format!(
                "Invalid storage identifier: {identifier:?}"
            )));
        }
        Ok(self.root.join(format!("{identifier}.png")))
    }

    pub fn address_for(path: &Path) -> String {
        format!("file://{}", path.display())
    }
}

#[async_trait]
impl Uploader for LocalDirStore {
    async fn upload(&self, identifier: &str, png_bytes: Vec<u8>) -> LogoResult<String> {
        let path = self.path_for(identifier)?;
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            LogoError::Storage(format!(
                "Failed to create directory {}: {e}",
                self.root.display()
            ))
        })?;
        tokio::fs::write(&path, png_bytes).await?;
        tracing::debug!("Stored {}", path.display());
        Ok(Self::address_for(&path))
    }

    async fn delete(&self, identifier: &str) -> LogoResult<()> {
        let path = self.path_for(identifier)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LogoError::Storage(format!(
                "Failed to delete {}: {e}",
                path.display()
            ))),
        }
    }
}
