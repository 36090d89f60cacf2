use crate::{CoreError, Profile};
use std::path::Path;
use tracing::{debug, warn};

/// Substitutes a drive letter for a profile's virtual drive directory.
pub trait DriveMapper {
    /// Profiles without a virtual drive map as a no-op.
    fn map(&mut self, profile: &Profile, settings_dir: &Path) -> Result<(), CoreError>;
    fn unmap(&mut self) -> Result<(), CoreError>;
}

/// Keeps a drive mapped for as long as it lives.
///
/// `unmap` runs exactly once: either through [`DriveGuard::release`] or when
/// the guard is dropped on an early return.
pub struct DriveGuard<'a> {
    mapper: &'a mut dyn DriveMapper,
    released: bool,
}

impl<'a> DriveGuard<'a> {
    pub fn acquire(
        mapper: &'a mut dyn DriveMapper,
        profile: &Profile,
        settings_dir: &Path,
    ) -> Result<Self, CoreError> {
        mapper.map(profile, settings_dir)?;
        debug!(profile = %profile.name, "virtual drive mapped");
        Ok(Self {
            mapper,
            released: false,
        })
    }

    pub fn release(mut self) -> Result<(), CoreError> {
        self.released = true;
        self.mapper.unmap()
    }
}

impl Drop for DriveGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = self.mapper.unmap() {
            warn!(error = %e, "could not remove virtual drive");
        }
    }
}
