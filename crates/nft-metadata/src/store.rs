//! Artifact storage
//!
//! One document per token, stored as `<root>/<collection>/<token_id>.json`.
//! The collection directory name is the lowercase `0x` address so reruns with
//! differently-cased input land in the same place.
//!
//! Writes go to a temporary sibling first and are renamed into place, so a
//! `<token_id>.json` that exists is always complete.
//!
//! Existence checks and writes are not atomic with respect to each other. Two
//! runs against the same root at the same time may both fetch a token; that
//! setup is not supported.

use std::path::{Path, PathBuf};

use alloy::primitives::Address;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{MetadataError, Result};
use crate::types::TokenId;

/// Key/value surface for persisted metadata documents
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Make the collection namespace ready for writes
    async fn prepare(&self, collection: Address) -> Result<()>;

    async fn exists(&self, collection: Address, token_id: TokenId) -> Result<bool>;

    async fn read(&self, collection: Address, token_id: TokenId) -> Result<Option<Bytes>>;

    /// Unconditional write. A second write for the same key replaces the first.
    async fn write(&self, collection: Address, token_id: TokenId, body: Bytes) -> Result<()>;
}

/// [`ArtifactStore`] on the local file system
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn collection_dir(&self, collection: Address) -> PathBuf {
        self.root.join(collection_key(collection))
    }

    pub fn artifact_path(&self, collection: Address, token_id: TokenId) -> PathBuf {
        self.collection_dir(collection)
            .join(format!("{token_id}.json"))
    }
}

/// Directory name for a collection
pub fn collection_key(collection: Address) -> String {
    format!("{collection:#x}")
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn prepare(&self, collection: Address) -> Result<()> {
        let dir = self.collection_dir(collection);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| MetadataError::store(dir.display().to_string(), e))
    }

    async fn exists(&self, collection: Address, token_id: TokenId) -> Result<bool> {
        let path = self.artifact_path(collection, token_id);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| MetadataError::store(path.display().to_string(), e))
    }

    async fn read(&self, collection: Address, token_id: TokenId) -> Result<Option<Bytes>> {
        let path = self.artifact_path(collection, token_id);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(MetadataError::store(path.display().to_string(), e)),
        }
    }

    async fn write(&self, collection: Address, token_id: TokenId, body: Bytes) -> Result<()> {
        let path = self.artifact_path(collection, token_id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| MetadataError::store(parent.display().to_string(), e))?;
        }

        let temp_path = path.with_file_name(format!("{token_id}.json.tmp.{}", Uuid::new_v4()));
        if let Err(e) = write_then_rename(&temp_path, &path, &body).await {
            if let Err(cleanup) = tokio::fs::remove_file(&temp_path).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %temp_path.display(), error = %cleanup, "Could not remove temporary artifact");
                }
            }
            return Err(MetadataError::store(path.display().to_string(), e));
        }

        debug!(path = %path.display(), bytes = body.len(), "Wrote artifact");
        Ok(())
    }
}

async fn write_then_rename(temp_path: &Path, path: &Path, body: &[u8]) -> std::io::Result<()> {
    {
        let mut file = tokio::fs::File::create(temp_path).await?;
        file.write_all(body).await?;
        file.sync_all().await?;
    }
    tokio::fs::rename(temp_path, path).await
}
