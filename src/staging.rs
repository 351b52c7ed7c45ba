//! Local staging of upload payloads
//!
//! The transport uploads from a local file path, so payload bytes are first
//! written to a uniquely named temporary file. The returned [`StagedFile`]
//! deletes that file exactly once: explicitly through
//! [`StagedFile::release`], or on drop for every other exit path.

use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{debug, warn};

use crate::error::OperationError;

const STAGE_PREFIX: &str = "ftpflow-stage-";

/// Directory in which upload payloads are staged
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Stage into the system temporary directory
    pub fn system() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `data` to a fresh temporary file
    pub async fn stage(&self, data: &[u8]) -> Result<StagedFile, OperationError> {
        self.stage_from(data).await
    }

    /// Copy everything `source` yields into a fresh temporary file.
    ///
    /// On failure the partially written file is removed before the error
    /// is returned.
    pub async fn stage_from<R>(&self, mut source: R) -> Result<StagedFile, OperationError>
    where
        R: AsyncRead + Unpin,
    {
        let path = self
            .dir
            .join(format!("{}{}.tmp", STAGE_PREFIX, uuid::Uuid::new_v4()));

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| OperationError::staging(&path, e))?;

        // From here on the guard owns the file
        let staged = StagedFile::new(path);

        let written = match copy_into(&mut source, file).await {
            Ok(n) => n,
            Err(e) => return Err(OperationError::staging(staged.path(), e)),
        };

        debug!("Staged {} bytes at {}", written, staged.path().display());
        Ok(staged)
    }
}

/// Copy and sync; the file handle is closed before returning.
async fn copy_into<R>(source: &mut R, mut file: tokio::fs::File) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin,
{
    let written = tokio::io::copy(source, &mut file).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

impl Default for StagingArea {
    fn default() -> Self {
        Self::system()
    }
}

/// Scoped handle to a staged temporary file.
pub struct StagedFile {
    path: PathBuf,
    released: bool,
}

impl StagedFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            released: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the staged file now.
    pub async fn release(mut self) {
        self.released = true;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => debug!("Released staged file {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove staged file {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Staged file {} removed on drop", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove staged file {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}
