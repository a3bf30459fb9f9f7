//! Settings persistence port

use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::config::AppConfig;
use crate::domain::error::ConfigError;

/// Where `voice-chat` keeps its settings between runs
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Stored settings; every field is `None` when nothing has been saved yet
    async fn load(&self) -> Result<AppConfig, ConfigError>;

    async fn save(&self, config: &AppConfig) -> Result<(), ConfigError>;

    /// Location shown by `config path`
    fn path(&self) -> PathBuf;

    fn exists(&self) -> bool;

    /// Write `AppConfig::defaults()`, refusing to overwrite an existing store
    async fn init(&self) -> Result<(), ConfigError>;
}
