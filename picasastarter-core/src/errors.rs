use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("no configuration file found (first run)")]
    ConfigMissing,
    #[error("settings file not found: {}", .0.display())]
    SettingsFileMissing(PathBuf),
    #[error("error reading settings file: {0}")]
    SettingsParse(String),
    #[error("database not found: {0}")]
    DatabaseNotFound(String),
    #[error("{0} is already running")]
    AlreadyRunning(String),
    #[error("could not create button {button}: {reason}")]
    ButtonCreation { button: String, reason: String },
    #[error("error saving settings: {0}")]
    SaveSettings(String),
    #[error("virtual drive mapping failed: {0}")]
    DriveMapping(String),
    #[error("could not start Picasa: {0}")]
    Launch(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid input: {0}")]
    Invalid(&'static str),
}
