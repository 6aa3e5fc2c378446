use std::fmt;

use async_trait::async_trait;
use uuid::Uuid;

use super::error::MediaError;

/// Storage key of a media object, e.g. `images/3f2a….jpg`.
///
/// Keys are relative slash-separated paths; absolute paths and traversal
/// segments are rejected.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MediaKey(String);

impl MediaKey {
    pub fn new(key: impl Into<String>) -> Result<Self, MediaError> {
        let key = key.into();
        validate(&key)?;
        Ok(Self(key))
    }

    /// Fresh random key for an uploaded review image.
    pub fn fresh_image() -> Self {
        Self(format!("images/{}.jpg", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn validate(key: &str) -> Result<(), MediaError> {
    if key.is_empty() {
        return Err(MediaError::InvalidKey("key must not be empty".into()));
    }
    if key.contains('\\') {
        return Err(MediaError::InvalidKey("backslash not allowed".into()));
    }
    if key.starts_with('/') {
        return Err(MediaError::InvalidKey("key must be relative".into()));
    }
    for segment in key.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(MediaError::InvalidKey(format!(
                "invalid path segment in {key:?}"
            )));
        }
    }
    Ok(())
}

/// Durable binary object store addressed by caller-chosen keys.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store `data` under `key`, replacing any prior object.
    async fn put(&self, key: &MediaKey, data: &[u8]) -> Result<(), MediaError>;

    /// Resolve the durable retrieval URL of an uploaded object.
    async fn resolve_url(&self, key: &MediaKey) -> Result<String, MediaError>;

    /// Delete the object under `key`.
    ///
    /// Returns `true` if an object was deleted, `false` if none existed.
    async fn delete(&self, key: &MediaKey) -> Result<bool, MediaError>;
}
