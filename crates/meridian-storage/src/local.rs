use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::signed_url::UrlSigner;
use crate::traits::{Storage, StorageError, StorageResult};

/// Blobs as plain files below one root directory.
///
/// View links point at the API's download route: `{base_url}/{token}`, where
/// the token is signed by `signer` and carries the key and its expiry.
#[derive(Clone)]
pub struct LocalStorage {
    root: PathBuf,
    base_url: String,
    signer: UrlSigner,
}

impl LocalStorage {
    /// Creates `root` if it does not exist yet.
    pub async fn new(
        root: impl Into<PathBuf>,
        base_url: String,
        signer: UrlSigner,
    ) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::ConfigError(format!("cannot create {}: {}", root.display(), e))
        })?;

        Ok(Self {
            root,
            base_url: base_url.trim_end_matches('/').to_string(),
            signer,
        })
    }

    pub fn signer(&self) -> &UrlSigner {
        &self.signer
    }

    /// Only plain relative paths are accepted, so a key never leaves `root`.
    fn resolve(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey("key is empty".to_string()));
        }
        let relative = Path::new(key);
        let plain = relative
            .components()
            .all(|part| matches!(part, Component::Normal(_)));
        if !plain || key.contains("..") {
            return Err(StorageError::InvalidKey(format!(
                "{} is not a relative path inside storage",
                key
            )));
        }
        Ok(self.root.join(relative))
    }
}

async fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).await?;
    }
    let mut file = fs::File::create(path).await?;
    file.write_all(data).await?;
    file.sync_all().await
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put(&self, storage_key: &str, data: Bytes, _content_type: &str) -> StorageResult<()> {
        let path = self.resolve(storage_key)?;
        let started = Instant::now();

        write_synced(&path, &data)
            .await
            .map_err(|e| StorageError::UploadFailed(format!("{}: {}", path.display(), e)))?;

        tracing::info!(
            key = %storage_key,
            size_bytes = data.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Stored blob"
        );
        Ok(())
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        let path = self.resolve(storage_key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(storage_key.to_string()))
            }
            Err(e) => Err(StorageError::DownloadFailed(format!(
                "{}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let path = self.resolve(storage_key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(key = %storage_key, "Removed blob");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "{}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn signed_url(&self, storage_key: &str, expires_in: Duration) -> StorageResult<String> {
        self.resolve(storage_key)?;
        let lifetime = chrono::Duration::from_std(expires_in)
            .map_err(|e| StorageError::ConfigError(format!("link lifetime: {}", e)))?;
        let token = self.signer.sign(storage_key, Utc::now() + lifetime)?;
        Ok(format!("{}/{}", self.base_url, token))
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let path = self.resolve(storage_key)?;
        Ok(fs::try_exists(&path).await?)
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}
