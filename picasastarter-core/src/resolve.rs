use crate::Profile;
use std::path::{Path, PathBuf};

/// Location of the Picasa database below a base directory.
pub const PICASA_DB_SUBDIR: &str = "Google/Picasa2";
/// Pre-3.9 databases sat one level deeper, under the XP-style profile tree.
pub const LEGACY_SUBDIR: &str = "Local Settings/Application Data";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathResolution {
    /// Base directory to hand to Picasa. `None` means Picasa's own default.
    Ready { base_dir: Option<PathBuf>, db_dir: PathBuf },
    /// Only a 3.8 layout exists; the user has to agree to use it.
    NeedsMigrationPrompt { legacy_base_dir: PathBuf },
    NotFound { expected: PathBuf },
}

pub fn db_dir(base_dir: &Path) -> PathBuf {
    base_dir.join(PICASA_DB_SUBDIR)
}

pub fn button_dir(db_dir: &Path) -> PathBuf {
    db_dir.join("buttons")
}

/// Decides where a profile's database lives without asking anybody.
///
/// The personal profile always resolves to `local_app_data`, even if Picasa
/// has not created its database there yet.
pub fn resolve_effective_path(profile: &Profile, local_app_data: &Path) -> PathResolution {
    if profile.is_standard {
        return PathResolution::Ready {
            base_dir: None,
            db_dir: db_dir(local_app_data),
        };
    }
    let Some(base) = profile.base_dir.as_deref() else {
        return PathResolution::NotFound {
            expected: PathBuf::from(PICASA_DB_SUBDIR),
        };
    };

    let current = db_dir(base);
    if current.is_dir() {
        return PathResolution::Ready {
            base_dir: Some(base.to_path_buf()),
            db_dir: current,
        };
    }
    let legacy_base = base.join(LEGACY_SUBDIR);
    if db_dir(&legacy_base).is_dir() {
        return PathResolution::NeedsMigrationPrompt {
            legacy_base_dir: legacy_base,
        };
    }
    PathResolution::NotFound { expected: current }
}
