use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Result, SnaptextError};

use super::UploadedImage;

/// The directory holding request-scoped transient files.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            SnaptextError::Storage(format!(
                "Failed to create upload directory {}: {e}",
                self.dir.display()
            ))
        })
    }

    /// Remove files left behind by a previous process that died mid-request.
    pub async fn purge_stale(&self) -> Result<usize> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut removed = 0;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %entry.path().display(), error = %e, "Could not remove stale upload"),
            }
        }

        Ok(removed)
    }

    /// Write the upload under a per-request key.
    ///
    /// The returned guard deletes the file when dropped; a failed write
    /// removes whatever partial file was created.
    pub async fn persist(&self, image: &UploadedImage, request_id: Uuid) -> Result<TransientFile> {
        let key = format!("{request_id}.{}", image.extension);
        let file = TransientFile {
            path: self.dir.join(&key),
            key,
            armed: true,
        };

        tokio::fs::write(&file.path, &image.bytes)
            .await
            .map_err(|e| SnaptextError::Storage(format!("Failed to save file: {e}")))?;

        Ok(file)
    }
}

/// A file that exists only for the lifetime of one request.
///
/// Removal happens exactly once: either through [`TransientFile::cleanup`]
/// on the normal path, or in `Drop` on early returns and panics.
#[derive(Debug)]
pub struct TransientFile {
    path: PathBuf,
    key: String,
    armed: bool,
}

impl TransientFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Storage key, the file name inside the upload directory.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub async fn cleanup(mut self) -> Result<()> {
        self.armed = false;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                info!(storage_key = %self.key, "Cleaned up transient upload");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SnaptextError::Storage(format!(
                "Could not delete {}: {e}",
                self.key
            ))),
        }
    }
}

impl Drop for TransientFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;
        match std::fs::remove_file(&self.path) {
            Ok(()) => info!(storage_key = %self.key, "Cleaned up transient upload"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(storage_key = %self.key, error = %e, "Could not delete transient upload"),
        }
    }
}
