use async_trait::async_trait;
use picasastarter_core::{CoreError, DriveMapper, LaunchRequest, PicasaRunner, ProcessProbe, Profile};
use std::path::Path;
use sysinfo::System;
use tracing::{debug, info, warn};

/// Maps virtual drives with `subst`.
#[derive(Debug, Default)]
pub struct SubstDriveMapper {
    mapped: Option<String>,
}

impl SubstDriveMapper {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(target_os = "windows")]
fn subst(args: &[&std::ffi::OsStr]) -> Result<(), CoreError> {
    let output = std::process::Command::new("subst")
        .args(args)
        .output()
        .map_err(|e| CoreError::DriveMapping(format!("could not run subst: {e}")))?;
    if output.status.success() {
        Ok(())
    } else {
        let mut reason = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if reason.is_empty() {
            reason = String::from_utf8_lossy(&output.stderr).trim().to_string();
        }
        Err(CoreError::DriveMapping(reason))
    }
}

#[cfg(not(target_os = "windows"))]
fn subst(_args: &[&std::ffi::OsStr]) -> Result<(), CoreError> {
    Err(CoreError::DriveMapping("virtual drives are only available on Windows".into()))
}

impl DriveMapper for SubstDriveMapper {
    fn map(&mut self, profile: &Profile, settings_dir: &Path) -> Result<(), CoreError> {
        let Some(drive) = profile.virtual_drive.as_ref() else {
            return Ok(());
        };
        let spec = drive.drive_spec()?;
        let target = drive.resolved_path(settings_dir);
        if !target.is_dir() {
            return Err(CoreError::DriveMapping(format!(
                "{} does not exist, cannot map {spec}",
                target.display()
            )));
        }

        debug!(drive = %spec, target = %target.display(), "subst");
        subst(&[spec.as_ref(), target.as_os_str()])?;
        info!(drive = %spec, profile = %profile.name, "virtual drive mapped");
        self.mapped = Some(spec);
        Ok(())
    }

    fn unmap(&mut self) -> Result<(), CoreError> {
        let Some(spec) = self.mapped.take() else {
            return Ok(());
        };
        debug!(drive = %spec, "subst /D");
        subst(&[spec.as_ref(), "/D".as_ref()])
    }
}

/// Looks for a process by name in the system process table.
#[derive(Debug, Default)]
pub struct SysinfoProbe;

/// Process names compare without a trailing `.exe` and ignoring case.
pub fn same_process(candidate: &str, wanted: &str) -> bool {
    fn stem(name: &str) -> String {
        let lower = name.to_lowercase();
        match lower.strip_suffix(".exe") {
            Some(s) => s.to_string(),
            None => lower,
        }
    }
    stem(candidate) == stem(wanted)
}

impl ProcessProbe for SysinfoProbe {
    fn is_running(&self, process_name: &str) -> bool {
        let mut sys = System::new();
        sys.refresh_processes();
        sys.processes()
            .values()
            .any(|p| same_process(p.name(), process_name))
    }
}

/// Starts Picasa as a child process and waits for it.
#[derive(Debug, Default)]
pub struct TokioRunner;

#[async_trait]
impl PicasaRunner for TokioRunner {
    async fn run(&self, request: &LaunchRequest) -> Result<(), CoreError> {
        let status = tokio::process::Command::new(&request.executable)
            .current_dir(&request.working_dir)
            .envs(request.env.iter().map(|(k, v)| (k.as_str(), v.as_os_str())))
            .status()
            .await
            .map_err(|e| CoreError::Launch(format!("{}: {e}", request.executable.display())))?;
        if !status.success() {
            warn!(%status, "Picasa exited with an error");
        }
        info!("Picasa closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use picasastarter_core::VirtualDrive;

    #[test]
    fn process_names_ignore_case_and_extension() {
        assert!(same_process("Picasa3.exe", "Picasa3"));
        assert!(same_process("PICASA3.EXE", "picasa3.exe"));
        assert!(same_process("picasa3", "Picasa3"));
        assert!(!same_process("Picasa3Updater.exe", "Picasa3"));
    }

    #[test]
    fn profiles_without_a_drive_map_as_no_op() {
        let mut mapper = SubstDriveMapper::new();
        mapper.map(&Profile::personal(), Path::new("/settings")).unwrap();
        assert!(mapper.mapped.is_none());
        mapper.unmap().unwrap();
    }

    #[test]
    fn missing_drive_target_is_a_mapping_error() {
        let tmp = tempfile::tempdir().unwrap();
        let mut p = Profile::custom("Family", tmp.path().join("family"));
        p.virtual_drive = Some(VirtualDrive::new('P', "not-there"));
        let mut mapper = SubstDriveMapper::new();
        assert!(matches!(mapper.map(&p, tmp.path()), Err(CoreError::DriveMapping(_))));
        assert!(mapper.mapped.is_none());
    }

    #[test]
    fn probe_does_not_find_a_made_up_process() {
        assert!(!SysinfoProbe.is_running("no-such-process-picasastarter"));
    }

    #[tokio::test]
    async fn unknown_executable_is_a_launch_error() {
        let tmp = tempfile::tempdir().unwrap();
        let req = LaunchRequest {
            executable: tmp.path().join("missing-picasa"),
            working_dir: tmp.path().to_path_buf(),
            env: Vec::new(),
        };
        assert!(matches!(TokioRunner.run(&req).await, Err(CoreError::Launch(_))));
    }
}
