use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

pub const CONFIG_FILE: &str = "PicasaStarterConfig.xml";
pub const SETTINGS_FILE: &str = "Settings.xml";

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Per-user directory holding the config file.
pub fn config_root() -> PathBuf {
    if let Some(pd) = ProjectDirs::from("org", "PicasaStarter", "PicasaStarter") {
        pd.config_dir().to_path_buf()
    } else {
        current_dir()
    }
}

/// Where Picasa keeps the personal database (`%LOCALAPPDATA%` on Windows).
pub fn local_app_data() -> PathBuf {
    match BaseDirs::new() {
        Some(dirs) => dirs.data_local_dir().to_path_buf(),
        None => current_dir(),
    }
}
