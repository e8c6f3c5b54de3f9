use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Disk store for process documents. Uploads land in a temp file inside the
/// storage directory and are only renamed into place after the database row
/// exists, so an aborted request never leaves an orphan document behind.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_root(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("creating upload dir {}", self.root.display()))?;
        info!("📁 Document storage: {}", self.root.display());
        Ok(())
    }

    pub fn path_for(&self, stored_name: &str) -> PathBuf {
        self.root.join(stored_name)
    }

    /// Buffer upload bytes into a temp file next to the final location.
    /// Same filesystem, so the later rename is atomic.
    pub async fn stage(&self, data: &[u8]) -> Result<NamedTempFile> {
        tokio::fs::create_dir_all(&self.root).await?;
        let temp = NamedTempFile::new_in(&self.root).context("creating staging file")?;
        let mut file = tokio::fs::File::from_std(temp.reopen().context("reopening staging file")?);
        file.write_all(data).await?;
        file.flush().await?;
        Ok(temp)
    }

    /// Move a staged upload to its permanent name. Dropping the staged file
    /// without committing deletes it.
    pub fn commit(&self, staged: NamedTempFile, stored_name: &str) -> Result<PathBuf> {
        let dest = self.path_for(stored_name);
        staged
            .persist(&dest)
            .with_context(|| format!("persisting {}", dest.display()))?;
        Ok(dest)
    }

    pub async fn open(&self, stored_name: &str) -> std::io::Result<(tokio::fs::File, u64)> {
        let path = self.path_for(stored_name);
        let file = tokio::fs::File::open(&path).await?;
        let len = file.metadata().await?.len();
        Ok((file, len))
    }

    /// Best-effort removal, used when deleting rows that reference the file
    pub async fn remove(&self, stored_name: &str) {
        let path = self.path_for(stored_name);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove document {}: {}", path.display(), e);
            }
        }
    }

    /// Storage health: the root exists (or can be created) and is writable
    pub async fn is_healthy(&self) -> bool {
        if tokio::fs::create_dir_all(&self.root).await.is_err() {
            return false;
        }
        match NamedTempFile::new_in(&self.root) {
            Ok(probe) => {
                drop(probe);
                true
            }
            Err(_) => false,
        }
    }
}
