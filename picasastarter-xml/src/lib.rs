use async_trait::async_trait;
use picasastarter_core::{Config, CoreError, Settings, SettingsStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::task;
use tracing::{debug, warn};

pub mod paths;

use paths::{CONFIG_FILE, SETTINGS_FILE};

const XML_DECL: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;
pub const DEFAULT_KEEP: usize = 10;
const DAMAGED_PREFIX: &str = "Settings-damaged-";

/// Config and settings kept as XML files.
///
/// The config lives in `config_dir`; the settings file lives in whatever
/// directory the caller passes, with timestamped snapshots of earlier
/// versions in a `backups` directory next to it.
pub struct XmlStore {
    config_dir: PathBuf,
    max_backups: usize,
}

impl XmlStore {
    pub fn open_default() -> Self {
        Self::open_with(paths::config_root(), DEFAULT_KEEP)
    }

    pub fn open_with(config_dir: PathBuf, max_backups: usize) -> Self {
        Self {
            config_dir,
            max_backups: max_backups.max(1),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }
}

pub fn settings_file(settings_dir: &Path) -> PathBuf {
    settings_dir.join(SETTINGS_FILE)
}

fn to_xml<T: Serialize>(root: &str, value: &T) -> Result<String, quick_xml::DeError> {
    let mut body = String::new();
    let mut ser = quick_xml::se::Serializer::with_root(&mut body, Some(root))?;
    ser.indent(' ', 2);
    value.serialize(ser)?;
    Ok(format!("{XML_DECL}\n{body}\n"))
}

fn from_xml<T: DeserializeOwned>(text: &str) -> Result<T, quick_xml::DeError> {
    quick_xml::de::from_str(text)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), std::io::Error> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn write_with_backup(path: &Path, backups_dir: &Path, max_backups: usize, xml: &str) -> Result<(), std::io::Error> {
    write_atomic(path, xml.as_bytes())?;

    let ts = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let backup_path = backups_dir.join(format!("Settings-{ts}.xml"));
    write_atomic(&backup_path, xml.as_bytes())?;

    rotate_backups(backups_dir, max_backups)
}

fn rotate_backups(dir: &Path, keep: usize) -> Result<(), std::io::Error> {
    let mut entries: Vec<_> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("xml"))
        .filter(|e| !e.file_name().to_string_lossy().starts_with(DAMAGED_PREFIX))
        .collect();
    // Snapshot names sort by time.
    entries.sort_by_key(|e| e.file_name());
    if entries.len() > keep {
        for e in &entries[0..entries.len() - keep] {
            if let Err(err) = fs::remove_file(e.path()) {
                warn!(file = %e.path().display(), error = %err, "could not prune settings snapshot");
            }
        }
    }
    Ok(())
}

/// Copies a settings file that failed to parse next to the snapshots, so a
/// later save cannot lose it.
fn keep_damaged(path: &Path, backups_dir: &Path) {
    let ts = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let copy = backups_dir.join(format!("{DAMAGED_PREFIX}{ts}.xml"));
    let kept = fs::create_dir_all(backups_dir).and_then(|_| fs::copy(path, &copy));
    match kept {
        Ok(_) => warn!(copy = %copy.display(), "damaged settings file kept"),
        Err(e) => warn!(file = %path.display(), error = %e, "could not keep damaged settings file"),
    }
}

#[async_trait]
impl SettingsStore for XmlStore {
    async fn load_config(&self) -> Result<Config, CoreError> {
        let path = self.config_file();
        task::spawn_blocking(move || {
            let text = match fs::read_to_string(&path) {
                Ok(text) => text,
                Err(_) => return Err(CoreError::ConfigMissing),
            };
            // An unreadable config is treated like a first run.
            from_xml::<Config>(&text).map_err(|e| {
                warn!(file = %path.display(), error = %e, "ignoring damaged config");
                CoreError::ConfigMissing
            })
        })
        .await
        .map_err(|e| CoreError::Storage(e.to_string()))?
    }

    async fn save_config(&self, config: &Config) -> Result<(), CoreError> {
        let path = self.config_file();
        let xml = to_xml("Configuration", config).map_err(|e| CoreError::Storage(e.to_string()))?;
        task::spawn_blocking(move || write_atomic(&path, xml.as_bytes()))
            .await
            .map_err(|e| CoreError::Storage(e.to_string()))?
            .map_err(|e| CoreError::Storage(e.to_string()))
    }

    async fn load_settings(&self, settings_dir: &Path) -> Result<Settings, CoreError> {
        let dir = settings_dir.to_path_buf();
        task::spawn_blocking(move || {
            let path = settings_file(&dir);
            if !path.is_file() {
                return Err(CoreError::SettingsFileMissing(dir));
            }
            let text = fs::read_to_string(&path).map_err(|e| CoreError::SettingsParse(e.to_string()))?;
            match from_xml::<Settings>(&text) {
                Ok(settings) => {
                    debug!(file = %path.display(), "settings loaded");
                    Ok(settings)
                }
                Err(e) => {
                    keep_damaged(&path, &dir.join("backups"));
                    Err(CoreError::SettingsParse(e.to_string()))
                }
            }
        })
        .await
        .map_err(|e| CoreError::Storage(e.to_string()))?
    }

    async fn save_settings(&self, settings: &Settings, settings_dir: &Path) -> Result<(), CoreError> {
        let xml = to_xml("Settings", settings).map_err(|e| CoreError::SaveSettings(e.to_string()))?;
        let path = settings_file(settings_dir);
        let backups = settings_dir.join("backups");
        let keep = self.max_backups;

        task::spawn_blocking(move || write_with_backup(&path, &backups, keep, &xml))
            .await
            .map_err(|e| CoreError::SaveSettings(e.to_string()))?
            .map_err(|e| CoreError::SaveSettings(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use picasastarter_core::{Button, Profile, VirtualDrive};

    const HAND_WRITTEN: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Settings>
  <PicasaExePath>D:\Apps\Picasa3\Picasa3.exe</PicasaExePath>
  <Profile>
    <Name>Personal</Name>
    <IsStandard>true</IsStandard>
  </Profile>
  <Profile>
    <Name>Family</Name>
    <BaseDir>\\nas\photos\family</BaseDir>
    <BackupDir>E:\backup</BackupDir>
    <LastBackupDate>2023-11-05</LastBackupDate>
    <IsStandard>false</IsStandard>
    <VirtualDrive>
      <Letter>P</Letter>
      <Path>photos</Path>
    </VirtualDrive>
  </Profile>
  <Button>
    <Id>upload</Id>
    <Label>Upload</Label>
    <Executable>upload.cmd</Executable>
  </Button>
</Settings>
"#;

    #[tokio::test]
    async fn reads_hand_written_settings() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(settings_file(tmp.path()), HAND_WRITTEN).unwrap();
        let store = XmlStore::open_with(tmp.path().to_path_buf(), 3);

        let s = store.load_settings(tmp.path()).await.unwrap();
        assert_eq!(s.profiles.len(), 2);
        assert!(s.profiles[0].is_standard);
        let family = s.find_profile("family").unwrap();
        assert_eq!(family.last_backup_date, NaiveDate::from_ymd_opt(2023, 11, 5));
        assert_eq!(family.virtual_drive, Some(VirtualDrive::new('P', "photos")));
        assert_eq!(s.buttons.len(), 1);
        assert!(s.buttons[0].enabled);
    }

    #[tokio::test]
    async fn saved_settings_load_back_and_leave_a_snapshot() {
        let tmp = tempfile::tempdir().unwrap();
        let store = XmlStore::open_with(tmp.path().join("cfg"), 3);
        let dir = tmp.path().join("settings");

        let mut s = Settings::with_default_profile();
        let mut work = Profile::custom("Work", "/data/work");
        work.backup_dir = Some("/mnt/backup".into());
        work.last_backup_date = NaiveDate::from_ymd_opt(2024, 2, 29);
        s.add_profile(work).unwrap();
        let mut b = Button::new("mail", "Mail & share", "mail.exe");
        b.arguments = Some("--to \"me\"".into());
        s.buttons.push(b);

        store.save_settings(&s, &dir).await.unwrap();
        assert_eq!(store.load_settings(&dir).await.unwrap(), s);
        assert_eq!(fs::read_dir(dir.join("backups")).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn missing_and_broken_settings_are_told_apart() {
        let tmp = tempfile::tempdir().unwrap();
        let store = XmlStore::open_with(tmp.path().to_path_buf(), 3);
        assert!(matches!(
            store.load_settings(&tmp.path().join("usb")).await,
            Err(CoreError::SettingsFileMissing(_))
        ));

        fs::write(settings_file(tmp.path()), "<Settings><Profile>").unwrap();
        assert!(matches!(
            store.load_settings(tmp.path()).await,
            Err(CoreError::SettingsParse(_))
        ));
    }

    #[tokio::test]
    async fn damaged_settings_survive_a_later_save() {
        let tmp = tempfile::tempdir().unwrap();
        let store = XmlStore::open_with(tmp.path().join("cfg"), 3);
        let dir = tmp.path().join("settings");
        fs::create_dir_all(&dir).unwrap();
        fs::write(settings_file(&dir), "<Settings><Profile>").unwrap();

        assert!(store.load_settings(&dir).await.is_err());
        store.save_settings(&Settings::with_default_profile(), &dir).await.unwrap();

        let kept: Vec<_> = fs::read_dir(dir.join("backups"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(DAMAGED_PREFIX))
            .collect();
        assert_eq!(kept.len(), 1);
        assert_eq!(fs::read_to_string(kept[0].path()).unwrap(), "<Settings><Profile>");
    }

    #[tokio::test]
    async fn config_round_trip_and_first_run() {
        let tmp = tempfile::tempdir().unwrap();
        let store = XmlStore::open_with(tmp.path().to_path_buf(), 3);
        assert!(matches!(store.load_config().await, Err(CoreError::ConfigMissing)));

        let cfg = Config {
            settings_dir: Some("/nas/picasastarter".into()),
        };
        store.save_config(&cfg).await.unwrap();
        assert_eq!(store.load_config().await.unwrap(), cfg);
    }

    #[test]
    fn rotation_keeps_newest_snapshots() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["Settings-20240101-000000.xml", "Settings-20240102-000000.xml", "Settings-20240103-000000.xml"] {
            fs::write(tmp.path().join(name), "x").unwrap();
        }
        fs::write(tmp.path().join("Settings-damaged-20231231-000000.xml"), "x").unwrap();
        rotate_backups(tmp.path(), 2).unwrap();
        assert!(!tmp.path().join("Settings-20240101-000000.xml").exists());
        assert!(tmp.path().join("Settings-damaged-20231231-000000.xml").exists());
        assert!(tmp.path().join("Settings-20240103-000000.xml").exists());
    }
}
