use crate::{Config, CoreError, Settings};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Default)]
pub struct MemoryStore {
    config: RwLock<Option<Config>>,
    settings: RwLock<HashMap<PathBuf, Settings>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
    unreadable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings_dir: impl Into<PathBuf>, settings: Settings) -> Self {
        let store = Self::new();
        store.settings.write().insert(settings_dir.into(), settings);
        store
    }

    pub fn stored(&self, settings_dir: &Path) -> Option<Settings> {
        self.settings.read().get(settings_dir).cloned()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Makes every following `load_settings` report a damaged file.
    pub fn unreadable_settings(&self, unreadable: bool) {
        self.unreadable.store(unreadable, Ordering::SeqCst);
    }

    /// Makes every following `save_settings` fail.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl crate::store::SettingsStore for MemoryStore {
    async fn load_config(&self) -> Result<Config, CoreError> {
        self.config.read().clone().ok_or(CoreError::ConfigMissing)
    }

    async fn save_config(&self, config: &Config) -> Result<(), CoreError> {
        *self.config.write() = Some(config.clone());
        Ok(())
    }

    async fn load_settings(&self, settings_dir: &Path) -> Result<Settings, CoreError> {
        if self.unreadable.load(Ordering::SeqCst) {
            return Err(CoreError::SettingsParse("unexpected end of document".into()));
        }
        self.settings
            .read()
            .get(settings_dir)
            .cloned()
            .ok_or_else(|| CoreError::SettingsFileMissing(settings_dir.to_path_buf()))
    }

    async fn save_settings(&self, settings: &Settings, settings_dir: &Path) -> Result<(), CoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(CoreError::SaveSettings("store is read-only".into()));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.settings
            .write()
            .insert(settings_dir.to_path_buf(), settings.clone());
        Ok(())
    }
}
