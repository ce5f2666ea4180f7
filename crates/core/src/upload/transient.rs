//! Transient local copies of uploaded photos.

use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::sanitized_extension;

/// A photo written to local disk, waiting to be forwarded to the media store.
///
/// Removal is explicit and async; dropping the handle leaves the file in place.
#[derive(Debug)]
pub struct TransientFile {
    path: PathBuf,
}

impl TransientFile {
    /// Write `bytes` into `dir` under a fresh name.
    ///
    /// The name is `{unix_millis}-{random}{.ext}`, the extension taken from the
    /// client's file name. The directory is created if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written. A file
    /// that was created but not fully written is removed first.
    pub async fn write(dir: &Path, original_name: Option<&str>, bytes: &[u8]) -> io::Result<Self> {
        tokio::fs::create_dir_all(dir).await?;

        let mut name = format!(
            "{}-{}",
            Utc::now().timestamp_millis(),
            &Uuid::new_v4().simple().to_string()[..8]
        );
        if let Some(ext) = sanitized_extension(original_name) {
            name.push('.');
            name.push_str(&ext);
        }

        let path = dir.join(name);
        write_new_file(&path, bytes).await?;
        Ok(Self { path })
    }

    /// Location on disk.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file. Deleting an already removed file succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub async fn remove(&self) -> io::Result<()> {
        remove_if_exists(&self.path).await
    }
}

/// Create `path`, which must not exist yet, and fill it with `bytes`.
async fn write_new_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;

    let written = async {
        file.write_all(bytes).await?;
        file.flush().await
    }
    .await;

    if let Err(e) = written {
        drop(file);
        let _ = remove_if_exists(path).await;
        return Err(e);
    }
    Ok(())
}

/// Remove a file, treating "already gone" as success.
pub(crate) async fn remove_if_exists(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
