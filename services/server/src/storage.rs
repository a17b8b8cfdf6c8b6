//! Blob storage for normalized images
//!
//! Blobs live in a flat directory, named `{id}.jpg`. The store only accepts
//! parsed [`ImageId`]s, so no caller-supplied path fragment ever reaches the
//! filesystem.

use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;

use crate::ids::ImageId;

/// Canonical extension of every stored blob
pub const BLOB_EXTENSION: &str = "jpg";

/// Blob store error type
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob not found")]
    NotFound,

    #[error("blob store I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Directory-backed blob store
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Open the store, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, BlobError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn blob_path(&self, id: &ImageId) -> PathBuf {
        self.root.join(format!("{}.{}", id, BLOB_EXTENSION))
    }

    /// Persist a blob under `id`.
    ///
    /// The bytes land in a temp file first and are renamed into place, so a
    /// concurrent reader never observes a partially written blob.
    pub async fn put(&self, id: &ImageId, bytes: &[u8]) -> Result<(), BlobError> {
        let tmp = self.root.join(format!("{}.part", id));
        fs::write(&tmp, bytes).await?;
        if let Err(e) = fs::rename(&tmp, self.blob_path(id)).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Read a blob back.
    pub async fn get(&self, id: &ImageId) -> Result<Vec<u8>, BlobError> {
        match fs::read(self.blob_path(id)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(BlobError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a blob.
    pub async fn delete(&self, id: &ImageId) -> Result<(), BlobError> {
        match fs::remove_file(self.blob_path(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(BlobError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether a blob exists for `id`.
    pub async fn exists(&self, id: &ImageId) -> bool {
        fs::try_exists(self.blob_path(id)).await.unwrap_or(false)
    }
}
