use crate::CoreError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const PERSONAL_PROFILE: &str = "Personal";
pub const ASK_USER: &str = "AskUser";
pub const PICASA_PROCESS: &str = "Picasa3";
pub const DEFAULT_PICASA_EXE: &str = r"C:\Program Files (x86)\Google\Picasa3\Picasa3.exe";

/// A drive letter substituted for a directory while a profile is in use.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct VirtualDrive {
    pub letter: String,
    pub path: PathBuf,
}

impl VirtualDrive {
    pub fn new(letter: char, path: impl Into<PathBuf>) -> Self {
        Self {
            letter: letter.to_string(),
            path: path.into(),
        }
    }

    /// `X:` form accepted by `subst`.
    pub fn drive_spec(&self) -> Result<String, CoreError> {
        let mut chars = self.letter.trim().trim_end_matches(':').chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphabetic() => Ok(format!("{}:", c.to_ascii_uppercase())),
            _ => Err(CoreError::Invalid("virtual drive letter must be a single letter")),
        }
    }

    /// Relative paths are taken relative to the settings directory so that
    /// settings kept on removable media follow the drive around.
    pub fn resolved_path(&self, settings_dir: &Path) -> PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            settings_dir.join(&self.path)
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Profile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_backup_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_standard: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_drive: Option<VirtualDrive>,
}

impl Profile {
    /// The user's own Picasa database in the default location.
    pub fn personal() -> Self {
        Self {
            name: PERSONAL_PROFILE.to_string(),
            description: Some("Picasa's standard personal database".to_string()),
            base_dir: None,
            backup_dir: None,
            last_backup_date: None,
            is_standard: true,
            virtual_drive: None,
        }
    }

    pub fn custom(name: impl Into<String>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            description: None,
            base_dir: Some(base_dir.into()),
            backup_dir: None,
            last_backup_date: None,
            is_standard: false,
            virtual_drive: None,
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.trim().to_lowercase()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Button {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    pub executable: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl Button {
    pub fn new(id: impl Into<String>, label: impl Into<String>, executable: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            tooltip: None,
            executable: executable.into(),
            arguments: None,
            enabled: true,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picasa_exe_path: Option<PathBuf>,
    #[serde(rename = "Profile", default)]
    pub profiles: Vec<Profile>,
    #[serde(rename = "Button", default)]
    pub buttons: Vec<Button>,
}

impl Settings {
    pub fn with_default_profile() -> Self {
        Self {
            picasa_exe_path: None,
            profiles: vec![Profile::personal()],
            buttons: Vec::new(),
        }
    }

    pub fn picasa_exe(&self) -> PathBuf {
        self.picasa_exe_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PICASA_EXE))
    }

    /// The first profile is the personal one by convention.
    pub fn personal(&self) -> Option<&Profile> {
        self.profiles.first()
    }

    pub fn ensure_default_profile(&mut self) {
        if self.profiles.is_empty() {
            self.profiles.push(Profile::personal());
        }
    }

    /// Case-insensitive lookup; with duplicates in a hand-edited file the
    /// first entry wins.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.profiles.iter().position(|p| p.matches(name))
    }

    pub fn find_profile(&self, name: &str) -> Option<&Profile> {
        self.position(name).map(|i| &self.profiles[i])
    }

    pub fn find_profile_mut(&mut self, name: &str) -> Option<&mut Profile> {
        self.position(name).map(move |i| &mut self.profiles[i])
    }

    pub fn add_profile(&mut self, profile: Profile) -> Result<(), CoreError> {
        if profile.name.trim().is_empty() {
            return Err(CoreError::Invalid("profile name must not be empty"));
        }
        if self.position(&profile.name).is_some() {
            return Err(CoreError::Conflict(format!(
                "a database named {} already exists",
                profile.name
            )));
        }
        self.profiles.push(profile);
        Ok(())
    }

    pub fn remove_profile(&mut self, name: &str) -> Result<Profile, CoreError> {
        match self.position(name) {
            None => Err(CoreError::DatabaseNotFound(name.to_string())),
            Some(0) => Err(CoreError::Invalid("the personal database cannot be removed")),
            Some(i) => Ok(self.profiles.remove(i)),
        }
    }
}

/// Where to find the settings file. Kept apart from [`Settings`] so the
/// settings can live on a NAS or portable drive.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_dir: Option<PathBuf>,
}

impl Config {
    pub fn settings_dir_or(&self, config_dir: &Path) -> PathBuf {
        match &self.settings_dir {
            Some(dir) if !dir.as_os_str().is_empty() => dir.clone(),
            _ => config_dir.to_path_buf(),
        }
    }
}
