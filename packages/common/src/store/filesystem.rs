use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use crate::config::MediaStoreConfig;

use super::error::MediaError;
use super::media::{MediaKey, MediaStore};

/// Filesystem-backed media store.
///
/// Objects live at `{base_path}/{key}`; writes go through a temp file in
/// `{base_path}/.tmp` and are renamed into place, so a key never exposes
/// a half-written object.
pub struct FilesystemMediaStore {
    base_path: PathBuf,
    public_base_url: String,
    max_object_size: u64,
}

impl FilesystemMediaStore {
    pub async fn new(
        base_path: PathBuf,
        public_base_url: impl Into<String>,
        max_object_size: u64,
    ) -> Result<Self, MediaError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            max_object_size,
        })
    }

    pub async fn from_config(config: &MediaStoreConfig) -> Result<Self, MediaError> {
        Self::new(
            config.base_path.clone(),
            config.public_base_url.clone(),
            config.max_object_size,
        )
        .await
    }

    fn object_path(&self, key: &MediaKey) -> PathBuf {
        self.base_path.join(key.as_str())
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl MediaStore for FilesystemMediaStore {
    async fn put(&self, key: &MediaKey, data: &[u8]) -> Result<(), MediaError> {
        if data.len() as u64 > self.max_object_size {
            return Err(MediaError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_object_size,
            });
        }

        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        let object_path = self.object_path(key);
        if let Some(parent) = object_path.parent() {
            if let Err(e) = fs::create_dir_all(parent).await {
                let _ = fs::remove_file(&temp_path).await;
                return Err(e.into());
            }
        }

        if let Err(e) = fs::rename(&temp_path, &object_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(())
    }

    async fn resolve_url(&self, key: &MediaKey) -> Result<String, MediaError> {
        if !fs::try_exists(self.object_path(key)).await? {
            return Err(MediaError::NotFound(key.to_string()));
        }
        Ok(format!("{}/{}", self.public_base_url, key))
    }

    async fn delete(&self, key: &MediaKey) -> Result<bool, MediaError> {
        match fs::remove_file(self.object_path(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
