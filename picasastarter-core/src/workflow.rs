use crate::backup::{backup_sources, copy_backup};
use crate::buttons::{prepare_buttons, register_buttons};
use crate::command::Target;
use crate::launcher::plan_launch;
use crate::store::SettingsStore;
use crate::{
    BackupOutcome, CoreError, DriveGuard, DriveMapper, PicasaRunner, ProcessProbe, Profile,
    ProfileSelector, Prompt, Selection, Settings, PERSONAL_PROFILE, PICASA_PROCESS,
};
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::task;
use tracing::{info, warn};

/// Settings loaded for this run and where they came from.
#[derive(Clone, Debug)]
pub struct Session {
    pub settings: Settings,
    pub settings_dir: PathBuf,
    /// Picasa's default database root for the personal profile.
    pub local_app_data: PathBuf,
}

/// Everything a workflow talks to besides the settings.
pub struct Services<'a> {
    pub store: &'a dyn SettingsStore,
    pub prompt: &'a mut dyn Prompt,
    pub selector: &'a mut dyn ProfileSelector,
    pub mapper: &'a mut dyn DriveMapper,
    pub probe: &'a dyn ProcessProbe,
    pub runner: &'a dyn PicasaRunner,
    pub cancel: Arc<AtomicBool>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Finished { profile: String, button_errors: usize },
    /// The user backed out of the selection; nothing was touched.
    Cancelled,
}

/// Turns a directive target into a profile name, asking the user if needed.
pub fn resolve_target(
    settings: &Settings,
    target: &Target,
    selector: &mut dyn ProfileSelector,
    for_backup: bool,
) -> Option<String> {
    let personal = || {
        settings
            .personal()
            .map(|p| p.name.clone())
            .unwrap_or_else(|| PERSONAL_PROFILE.to_string())
    };
    match target {
        Target::Personal => Some(personal()),
        Target::Named(name) => Some(name.clone()),
        Target::AskUser => match selector.select(&settings.profiles, for_backup) {
            Selection::Chosen(name) if name.eq_ignore_ascii_case(PERSONAL_PROFILE) => Some(personal()),
            Selection::Chosen(name) => Some(name),
            Selection::Cancelled => None,
        },
    }
}

fn find(settings: &Settings, name: &str) -> Result<Profile, CoreError> {
    settings
        .find_profile(name)
        .cloned()
        .ok_or_else(|| CoreError::DatabaseNotFound(name.to_string()))
}

/// Saves settings, reporting but otherwise ignoring a failure.
pub async fn persist(session: &Session, store: &dyn SettingsStore, prompt: &mut dyn Prompt) -> bool {
    match store.save_settings(&session.settings, &session.settings_dir).await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "settings not saved");
            prompt.warn(&e.to_string());
            false
        }
    }
}

/// `/autorun`: maps the profile's drive, lays out its buttons, starts Picasa
/// on it and waits for Picasa to exit.
pub async fn autorun(
    session: &mut Session,
    services: &mut Services<'_>,
    target: &Target,
) -> Result<RunOutcome, CoreError> {
    if services.probe.is_running(PICASA_PROCESS) {
        return Err(CoreError::AlreadyRunning(PICASA_PROCESS.to_string()));
    }
    let Some(name) = resolve_target(&session.settings, target, &mut *services.selector, false) else {
        info!("database selection cancelled");
        return Ok(RunOutcome::Cancelled);
    };
    let profile = find(&session.settings, &name)?;

    let guard = DriveGuard::acquire(&mut *services.mapper, &profile, &session.settings_dir)?;
    let plan = plan_launch(
        &profile,
        &session.settings,
        &session.settings_dir,
        &session.local_app_data,
        &mut *services.prompt,
    )?;

    let mut button_errors = 0;
    for result in prepare_buttons(&plan.button_dir, &session.settings.buttons) {
        if let Err(e) = result {
            button_errors += 1;
            warn!(error = %e, "button skipped");
            services.prompt.warn(&e.to_string());
        }
    }
    if let Err(e) = register_buttons(&plan.button_dir, &session.settings.buttons) {
        warn!(error = %e, "buttons not registered");
    }

    info!(profile = %profile.name, exe = %plan.request.executable.display(), "starting Picasa");
    let launched = services.runner.run(&plan.request).await;
    if let Err(e) = guard.release() {
        warn!(error = %e, "could not remove virtual drive");
    }
    launched?;

    Ok(RunOutcome::Finished {
        profile: profile.name,
        button_errors,
    })
}

/// `/backup`: copies the profile's database and records the date.
///
/// The last backup date only moves to `today` once the copy completed; a
/// cancelled or failed copy writes the previous date back.
pub async fn backup(
    session: &mut Session,
    services: &mut Services<'_>,
    target: &Target,
    today: NaiveDate,
) -> Result<BackupOutcome, CoreError> {
    let Some(name) = resolve_target(&session.settings, target, &mut *services.selector, true) else {
        info!("database selection cancelled");
        return Ok(BackupOutcome::Cancelled);
    };
    let profile = find(&session.settings, &name)?;
    let Some(backup_root) = profile.backup_dir.clone() else {
        return Err(CoreError::Invalid("no backup directory is set for this database"));
    };

    let guard = DriveGuard::acquire(&mut *services.mapper, &profile, &session.settings_dir)?;
    let sources = backup_sources(&profile, &session.local_app_data)?;
    let previous = profile.last_backup_date;

    let cancel = services.cancel.clone();
    let profile_name = profile.name.clone();
    let outcome = task::spawn_blocking(move || copy_backup(&sources, &backup_root, &profile_name, &cancel))
        .await
        .unwrap_or_else(|e| BackupOutcome::Failed(format!("backup task stopped: {e}")));

    if let Some(p) = session.settings.find_profile_mut(&profile.name) {
        p.last_backup_date = if outcome.is_completed() { Some(today) } else { previous };
    }
    persist(session, services.store, &mut *services.prompt).await;

    match &outcome {
        BackupOutcome::Completed(report) => info!(
            profile = %profile.name,
            files = report.files,
            to = %report.destination.display(),
            "backup recorded"
        ),
        BackupOutcome::Cancelled => services.prompt.info("Backup cancelled."),
        BackupOutcome::Failed(reason) => services.prompt.warn(&format!("Backup failed: {reason}")),
    }

    if let Err(e) = guard.release() {
        warn!(error = %e, "could not remove virtual drive");
    }
    Ok(outcome)
}
