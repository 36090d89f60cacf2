use crate::{Config, CoreError, Settings};
use async_trait::async_trait;
use std::path::Path;

pub mod memory;

#[async_trait]
pub trait SettingsStore: Send + Sync {
    // Config
    /// `ConfigMissing` on first run.
    async fn load_config(&self) -> Result<Config, CoreError>;
    async fn save_config(&self, config: &Config) -> Result<(), CoreError>;

    // Settings
    /// `SettingsFileMissing` when the directory or file is unreachable,
    /// `SettingsParse` when it exists but cannot be read.
    async fn load_settings(&self, settings_dir: &Path) -> Result<Settings, CoreError>;
    async fn save_settings(&self, settings: &Settings, settings_dir: &Path) -> Result<(), CoreError>;
}
