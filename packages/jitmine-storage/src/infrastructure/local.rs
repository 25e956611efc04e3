//! Local filesystem artifact store
//!
//! Location ids are relative paths under a root directory.

use async_trait::async_trait;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::domain::ArtifactStore;
use crate::{Result, StorageError};

#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Only plain relative components are accepted
    fn resolve(&self, location: &str) -> Result<PathBuf> {
        let relative = Path::new(location);
        let plain = !location.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !plain {
            return Err(StorageError::invalid_location(location));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn save_bytes(&self, location: &str, bytes: Vec<u8>) -> Result<bool> {
        let path = self.resolve(location)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Readers never see a partially written artifact
        let mut tmp = path.clone().into_os_string();
        tmp.push(".partial");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!("Artifact saved: {} ({} bytes)", location, bytes.len());
        Ok(true)
    }

    async fn load_bytes(&self, location: &str) -> Result<Option<Vec<u8>>> {
        let path = self.resolve(location)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, location: &str) -> Result<bool> {
        let path = self.resolve(location)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, location: &str) -> Result<bool> {
        let path = self.resolve(location)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }
}
