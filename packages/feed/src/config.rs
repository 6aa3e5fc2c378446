use common::config::MediaStoreConfig;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub media: MediaStoreConfig,
}

impl AppConfig {
    /// Load configuration with serde defaults, overridden by an optional
    /// `config/config.toml` and `MARGINALIA__*` environment variables
    /// (e.g. `MARGINALIA__MEDIA__BASE_PATH`).
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("config/config").required(false))
            .add_source(Environment::with_prefix("MARGINALIA").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
