use std::path::PathBuf;

use serde::Deserialize;

/// Filesystem media store configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct MediaStoreConfig {
    /// Directory media objects live under. Default: "./media".
    #[serde(default = "default_base_path")]
    pub base_path: PathBuf,
    /// Base URL prefixed to object keys by URL resolution.
    /// Default: "http://localhost:3000/media".
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// Maximum object size in bytes. Default: 8 MiB.
    #[serde(default = "default_max_object_size")]
    pub max_object_size: u64,
}

fn default_base_path() -> PathBuf {
    PathBuf::from("./media")
}
fn default_public_base_url() -> String {
    "http://localhost:3000/media".into()
}
fn default_max_object_size() -> u64 {
    8 * 1024 * 1024
}

impl Default for MediaStoreConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            public_base_url: default_public_base_url(),
            max_object_size: default_max_object_size(),
        }
    }
}
