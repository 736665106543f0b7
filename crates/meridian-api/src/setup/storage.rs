//! Storage setup and initialization

use std::sync::Arc;

use anyhow::{Context, Result};
use meridian_core::Config;
use meridian_storage::{LocalStorage, Storage, UrlSigner};

use crate::state::FileState;

/// File links are signed with a key derived from the session secret so a file
/// token can never pass as a session token or the other way round.
pub fn file_url_signer(jwt_secret: &str) -> UrlSigner {
    UrlSigner::new(format!("meridian-file-url:{}", jwt_secret))
}

pub async fn setup_storage(config: &Config) -> Result<FileState> {
    let signer = file_url_signer(&config.jwt_secret);
    let storage = LocalStorage::new(
        &config.storage_path,
        config.storage_base_url.clone(),
        signer.clone(),
    )
    .await
    .context("Failed to initialize local storage")?;

    tracing::info!(
        backend = storage.backend_name(),
        path = %config.storage_path,
        "Storage initialized"
    );

    let storage: Arc<dyn Storage> = Arc::new(storage);
    Ok(FileState { storage, signer })
}
