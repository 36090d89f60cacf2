use crate::resolve::{button_dir, db_dir, resolve_effective_path, PathResolution};
use crate::{CoreError, Profile, Prompt, Settings};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Answers whether a named process is alive on this machine.
pub trait ProcessProbe {
    fn is_running(&self, process_name: &str) -> bool;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaunchRequest {
    pub executable: PathBuf,
    pub working_dir: PathBuf,
    pub env: Vec<(String, OsString)>,
}

/// Starts Picasa and waits for it to exit.
#[async_trait]
pub trait PicasaRunner: Send + Sync {
    async fn run(&self, request: &LaunchRequest) -> Result<(), CoreError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaunchPlan {
    pub button_dir: PathBuf,
    pub request: LaunchRequest,
}

/// Builds the environment that points Picasa at `base_dir`.
///
/// Picasa finds its database through `LOCALAPPDATA`; `USERPROFILE` is
/// redirected too so that older versions agree. The settings directory goes
/// first on `PATH` so button scripts kept next to the settings resolve.
pub fn build_request(
    executable: &Path,
    base_dir: Option<&Path>,
    settings_dir: &Path,
    current_path: Option<OsString>,
) -> LaunchRequest {
    let mut env = Vec::new();
    if let Some(base) = base_dir {
        env.push(("LOCALAPPDATA".to_string(), base.as_os_str().to_owned()));
        env.push(("USERPROFILE".to_string(), base.as_os_str().to_owned()));
    }

    let mut dirs = vec![settings_dir.to_path_buf()];
    if let Some(p) = current_path.as_ref() {
        dirs.extend(std::env::split_paths(p));
    }
    if let Ok(joined) = std::env::join_paths(dirs) {
        env.push(("PATH".to_string(), joined));
    }

    LaunchRequest {
        executable: executable.to_path_buf(),
        working_dir: settings_dir.to_path_buf(),
        env,
    }
}

/// Works out where the profile's database is and how to start Picasa on it.
///
/// A profile that only has a Picasa 3.8 database is used from its legacy
/// location if the user agrees; the profile itself is left untouched.
pub fn plan_launch(
    profile: &Profile,
    settings: &Settings,
    settings_dir: &Path,
    local_app_data: &Path,
    prompt: &mut dyn Prompt,
) -> Result<LaunchPlan, CoreError> {
    let not_found = |expected: PathBuf| {
        CoreError::DatabaseNotFound(format!(
            "{} (no database at {})",
            profile.name,
            expected.display()
        ))
    };

    let (base_dir, db) = match resolve_effective_path(profile, local_app_data) {
        PathResolution::Ready { base_dir, db_dir } => (base_dir, db_dir),
        PathResolution::NotFound { expected } => return Err(not_found(expected)),
        PathResolution::NeedsMigrationPrompt { legacy_base_dir } => {
            let question = format!(
                "Do you want to temporarily use the Picasa version 3.8 database?\n\
                 This Picasa 3.8 database path is:\n {}\n\n\
                 Please edit the database settings and convert the database to version 3.9 \
                 to stop receiving this warning.",
                legacy_base_dir.display()
            );
            if !prompt.confirm(&question) {
                let expected = profile.base_dir.as_deref().map(db_dir).unwrap_or_default();
                return Err(not_found(expected));
            }
            info!(profile = %profile.name, "using legacy 3.8 database layout");
            (Some(legacy_base_dir.clone()), db_dir(&legacy_base_dir))
        }
    };

    debug!(db = %db.display(), "database resolved");
    Ok(LaunchPlan {
        button_dir: button_dir(&db),
        request: build_request(
            &settings.picasa_exe(),
            base_dir.as_deref(),
            settings_dir,
            std::env::var_os("PATH"),
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::{LEGACY_SUBDIR, PICASA_DB_SUBDIR};
    use crate::ScriptedPrompt;
    use std::fs;

    fn env_of<'a>(req: &'a LaunchRequest, key: &str) -> Option<&'a OsString> {
        req.env.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    #[test]
    fn custom_profile_redirects_app_data() {
        let req = build_request(
            Path::new("picasa.exe"),
            Some(Path::new("/db/family")),
            Path::new("/settings"),
            None,
        );
        assert_eq!(env_of(&req, "LOCALAPPDATA").unwrap(), "/db/family");
        assert_eq!(env_of(&req, "USERPROFILE").unwrap(), "/db/family");
        assert_eq!(req.working_dir, PathBuf::from("/settings"));
    }

    #[test]
    fn personal_profile_keeps_app_data() {
        let req = build_request(Path::new("picasa.exe"), None, Path::new("/settings"), None);
        assert!(env_of(&req, "LOCALAPPDATA").is_none());
        let path = env_of(&req, "PATH").unwrap();
        let first = std::env::split_paths(path).next().unwrap();
        assert_eq!(first, PathBuf::from("/settings"));
    }

    #[test]
    fn declined_legacy_prompt_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join(LEGACY_SUBDIR).join(PICASA_DB_SUBDIR)).unwrap();
        let profile = Profile::custom("Old", tmp.path());
        let settings = Settings::with_default_profile();

        let mut no = ScriptedPrompt::answering(false);
        let err = plan_launch(&profile, &settings, tmp.path(), tmp.path(), &mut no).unwrap_err();
        assert!(matches!(err, CoreError::DatabaseNotFound(_)));
        assert_eq!(no.questions.len(), 1);

        let mut yes = ScriptedPrompt::answering(true);
        let plan = plan_launch(&profile, &settings, tmp.path(), tmp.path(), &mut yes).unwrap();
        assert!(plan.button_dir.starts_with(tmp.path().join(LEGACY_SUBDIR)));
        assert_eq!(
            env_of(&plan.request, "LOCALAPPDATA").unwrap(),
            tmp.path().join(LEGACY_SUBDIR).as_os_str()
        );
    }
}
