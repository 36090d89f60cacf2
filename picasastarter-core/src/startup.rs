use crate::store::SettingsStore;
use crate::{Config, CoreError, MissingSettings, Prompt, Settings};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Startup {
    Ready(LoadedState),
    /// The user gave up waiting for the settings drive.
    Abort,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedState {
    pub config: Config,
    pub settings: Settings,
    pub settings_dir: PathBuf,
    /// No usable config yet; the settings location still has to be chosen.
    pub first_run: bool,
}

fn first_run(config_dir: &Path) -> Startup {
    Startup::Ready(LoadedState {
        config: Config::default(),
        settings: Settings::with_default_profile(),
        settings_dir: config_dir.to_path_buf(),
        first_run: true,
    })
}

/// Loads config and settings the way every run starts.
///
/// A settings file that cannot be parsed is replaced by defaults in memory
/// and not saved at startup. A later save in the same session overwrites it;
/// the store keeps a copy of the damaged file for recovery.
pub async fn load_state(
    store: &dyn SettingsStore,
    config_dir: &Path,
    prompt: &mut dyn Prompt,
) -> Result<Startup, CoreError> {
    let config = match store.load_config().await {
        Ok(config) => config,
        Err(CoreError::ConfigMissing) => {
            info!(dir = %config_dir.display(), "no configuration, first run");
            return Ok(first_run(config_dir));
        }
        Err(e) => return Err(e),
    };
    let settings_dir = config.settings_dir_or(config_dir);

    loop {
        match store.load_settings(&settings_dir).await {
            Ok(mut settings) => {
                settings.ensure_default_profile();
                if let Err(e) = store.save_settings(&settings, &settings_dir).await {
                    warn!(error = %e, "settings not saved");
                    prompt.warn(&e.to_string());
                }
                return Ok(Startup::Ready(LoadedState {
                    config,
                    settings,
                    settings_dir,
                    first_run: false,
                }));
            }
            Err(CoreError::SettingsFileMissing(dir)) => match prompt.missing_settings(&dir) {
                MissingSettings::Retry => continue,
                MissingSettings::Relocate => return Ok(first_run(config_dir)),
                MissingSettings::Abort => return Ok(Startup::Abort),
            },
            Err(e @ CoreError::SettingsParse(_)) => {
                warn!(error = %e, "falling back to default settings");
                prompt.warn(&e.to_string());
                return Ok(Startup::Ready(LoadedState {
                    config,
                    settings: Settings::with_default_profile(),
                    settings_dir,
                    first_run: false,
                }));
            }
            Err(e) => return Err(e),
        }
    }
}
