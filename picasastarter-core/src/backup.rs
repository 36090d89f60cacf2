use crate::resolve::{db_dir, resolve_effective_path, PathResolution};
use crate::{CoreError, Profile};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackupReport {
    pub destination: PathBuf,
    pub files: u64,
    pub bytes: u64,
}

/// How a single backup run ended. Replaces the old global "complete" flag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackupOutcome {
    Completed(BackupReport),
    Cancelled,
    Failed(String),
}

impl BackupOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, BackupOutcome::Completed(_))
    }
}

/// Album data Picasa keeps next to its database directory.
pub const ALBUMS_DIR: &str = "Picasa2Albums";

/// The database directory plus the albums directory beside it, if any.
///
/// Only Picasa's own directories are returned; other applications sharing the
/// `Google` directory are left out. Backups never ask about the legacy layout:
/// whatever exists is copied.
pub fn backup_sources(profile: &Profile, local_app_data: &Path) -> Result<Vec<PathBuf>, CoreError> {
    let db = match resolve_effective_path(profile, local_app_data) {
        PathResolution::Ready { db_dir, .. } => db_dir,
        PathResolution::NeedsMigrationPrompt { legacy_base_dir } => db_dir(&legacy_base_dir),
        PathResolution::NotFound { expected } => {
            return Err(CoreError::DatabaseNotFound(format!(
                "{} (no database at {})",
                profile.name,
                expected.display()
            )))
        }
    };
    let albums = db.parent().map(|google| google.join(ALBUMS_DIR));
    let mut sources = vec![db];
    sources.extend(albums.filter(|a| a.is_dir()));
    Ok(sources)
}

/// Directory name used for a profile below its backup directory.
pub fn backup_dir_name(profile_name: &str) -> String {
    let cleaned: String = profile_name
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '-' | '_' | ' ' | '.') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "database".to_string()
    } else {
        cleaned
    }
}

enum CopyError {
    Cancelled,
    Io(String),
}

impl From<io::Error> for CopyError {
    fn from(e: io::Error) -> Self {
        CopyError::Io(e.to_string())
    }
}

fn copy_into(source: &Path, staging_root: &Path, cancel: &AtomicBool) -> Result<(u64, u64), CopyError> {
    let staging = match source.file_name() {
        Some(name) => staging_root.join(name),
        None => return Err(CopyError::Io(format!("{} has no directory name", source.display()))),
    };
    fs::create_dir_all(&staging)?;
    let (mut files, mut bytes) = (0u64, 0u64);
    for entry in WalkDir::new(source).min_depth(1).sort_by_file_name() {
        if cancel.load(Ordering::Relaxed) {
            return Err(CopyError::Cancelled);
        }
        let entry = entry.map_err(|e| CopyError::Io(e.to_string()))?;
        let rel = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| CopyError::Io(e.to_string()))?;
        let target = staging.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            bytes += fs::copy(entry.path(), &target)?;
            files += 1;
        } else {
            debug!(path = %entry.path().display(), "skipping non-regular file");
        }
    }
    if cancel.load(Ordering::Relaxed) {
        return Err(CopyError::Cancelled);
    }
    Ok((files, bytes))
}

fn swap_into_place(staging: &Path, destination: &Path, old: &Path) -> io::Result<()> {
    if destination.exists() {
        if old.exists() {
            fs::remove_dir_all(old)?;
        }
        fs::rename(destination, old)?;
        fs::rename(staging, destination)?;
        if let Err(e) = fs::remove_dir_all(old) {
            warn!(path = %old.display(), error = %e, "could not remove previous backup");
        }
        Ok(())
    } else {
        fs::rename(staging, destination)
    }
}

fn discard(staging: &Path) {
    if staging.exists() {
        if let Err(e) = fs::remove_dir_all(staging) {
            warn!(path = %staging.display(), error = %e, "could not remove partial backup");
        }
    }
}

/// Copies each of `sources` to `backup_root/name/<source dir name>`.
///
/// The trees are copied into a hidden staging directory first and only renamed
/// onto the destination once every file made it; an interrupted run leaves the
/// previous backup intact. `cancel` is checked before each entry.
pub fn copy_backup(sources: &[PathBuf], backup_root: &Path, name: &str, cancel: &AtomicBool) -> BackupOutcome {
    if sources.is_empty() {
        return BackupOutcome::Failed("nothing to back up".into());
    }
    for source in sources {
        if !source.is_dir() {
            return BackupOutcome::Failed(format!("{} is not a directory", source.display()));
        }
        if backup_root.starts_with(source) {
            return BackupOutcome::Failed("the backup directory is inside the database directory".into());
        }
    }
    if let Err(e) = fs::create_dir_all(backup_root) {
        return BackupOutcome::Failed(format!("cannot create {}: {e}", backup_root.display()));
    }

    let dir_name = backup_dir_name(name);
    let destination = backup_root.join(&dir_name);
    let staging = backup_root.join(format!(".{dir_name}.partial"));
    let old = backup_root.join(format!(".{dir_name}.old"));
    discard(&staging);

    info!(sources = sources.len(), to = %destination.display(), "backup started");
    let copied: Result<(u64, u64), CopyError> = sources.iter().try_fold((0u64, 0u64), |(files, bytes), source| {
        let (f, b) = copy_into(source, &staging, cancel)?;
        Ok((files + f, bytes + b))
    });
    match copied {
        Ok((files, bytes)) => match swap_into_place(&staging, &destination, &old) {
            Ok(()) => {
                info!(files, bytes, "backup complete");
                BackupOutcome::Completed(BackupReport {
                    destination,
                    files,
                    bytes,
                })
            }
            Err(e) => {
                discard(&staging);
                BackupOutcome::Failed(format!("cannot move backup into place: {e}"))
            }
        },
        Err(CopyError::Cancelled) => {
            discard(&staging);
            info!("backup cancelled");
            BackupOutcome::Cancelled
        }
        Err(CopyError::Io(reason)) => {
            discard(&staging);
            BackupOutcome::Failed(reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree(root: &Path) -> Vec<PathBuf> {
        fs::create_dir_all(root.join("Picasa2/db3")).unwrap();
        fs::create_dir_all(root.join("Picasa2Albums")).unwrap();
        fs::write(root.join("Picasa2/db3/thumbs.db"), b"0123456789").unwrap();
        fs::write(root.join("Picasa2Albums/albums.pal"), b"abc").unwrap();
        vec![root.join("Picasa2"), root.join("Picasa2Albums")]
    }

    #[test]
    fn copies_whole_tree() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let sources = sample_tree(src.path());

        let out = copy_backup(&sources, dst.path(), "Family", &AtomicBool::new(false));
        let report = match out {
            BackupOutcome::Completed(report) => report,
            other => panic!("expected completion, got {other:?}"),
        };
        assert_eq!(report.files, 2);
        assert_eq!(report.bytes, 13);
        assert_eq!(report.destination, dst.path().join("Family"));
        assert_eq!(
            fs::read(dst.path().join("Family/Picasa2/db3/thumbs.db")).unwrap(),
            b"0123456789"
        );
        assert_eq!(fs::read(dst.path().join("Family/Picasa2Albums/albums.pal")).unwrap(), b"abc");
        assert!(!dst.path().join(".Family.partial").exists());
    }

    #[test]
    fn personal_backup_leaves_other_google_apps_out() {
        let appdata = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let google = appdata.path().join("Google");
        sample_tree(&google);
        fs::create_dir_all(google.join("Chrome/User Data/Default")).unwrap();
        fs::write(google.join("Chrome/User Data/Default/Cookies"), b"chrome").unwrap();

        let sources = backup_sources(&Profile::personal(), appdata.path()).unwrap();
        assert_eq!(sources, vec![google.join("Picasa2"), google.join("Picasa2Albums")]);

        let out = copy_backup(&sources, dst.path(), "Personal", &AtomicBool::new(false));
        assert!(out.is_completed());
        assert!(dst.path().join("Personal/Picasa2/db3/thumbs.db").is_file());
        assert!(dst.path().join("Personal/Picasa2Albums/albums.pal").is_file());
        assert!(!dst.path().join("Personal/Chrome").exists());
    }

    #[test]
    fn albums_are_optional() {
        let base = tempfile::tempdir().unwrap();
        fs::create_dir_all(base.path().join("Google/Picasa2")).unwrap();
        let profile = Profile::custom("Family", base.path());
        assert_eq!(
            backup_sources(&profile, Path::new("/unused")).unwrap(),
            vec![base.path().join("Google/Picasa2")]
        );
    }

    #[test]
    fn cancelled_run_keeps_previous_backup() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let sources = sample_tree(src.path());
        fs::create_dir_all(dst.path().join("Family")).unwrap();
        fs::write(dst.path().join("Family/marker"), b"old").unwrap();

        let out = copy_backup(&sources, dst.path(), "Family", &AtomicBool::new(true));
        assert_eq!(out, BackupOutcome::Cancelled);
        assert_eq!(fs::read(dst.path().join("Family/marker")).unwrap(), b"old");
        assert!(!dst.path().join(".Family.partial").exists());
    }

    #[test]
    fn replaces_previous_backup_on_success() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let sources = sample_tree(src.path());
        fs::create_dir_all(dst.path().join("Family")).unwrap();
        fs::write(dst.path().join("Family/marker"), b"old").unwrap();

        assert!(copy_backup(&sources, dst.path(), "Family", &AtomicBool::new(false)).is_completed());
        assert!(!dst.path().join("Family/marker").exists());
        assert!(!dst.path().join(".Family.old").exists());
    }

    #[test]
    fn missing_source_fails() {
        let dst = tempfile::tempdir().unwrap();
        let out = copy_backup(&[dst.path().join("nope")], dst.path(), "X", &AtomicBool::new(false));
        assert!(matches!(out, BackupOutcome::Failed(_)));
    }

    #[test]
    fn names_are_made_safe() {
        assert_eq!(backup_dir_name("Family/2019"), "Family_2019");
        assert_eq!(backup_dir_name(".."), "database");
        assert_eq!(backup_dir_name(" Work "), "Work");
    }
}
