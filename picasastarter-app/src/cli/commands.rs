use crate::cli::opts::Cli;
use crate::console::{read_line, ConsolePrompt, ConsoleSelector};
use crate::interactive;
use crate::platform::{SubstDriveMapper, SysinfoProbe, TokioRunner};
use crate::signals::Interrupts;

use anyhow::{Context, Result};
use chrono::Local;
use picasastarter_core::startup::{load_state, Startup};
use picasastarter_core::workflow::{self, RunOutcome, Services, Session};
use picasastarter_core::{
    parse_directives, BackupOutcome, Command, Config, CoreError, Prompt, Settings, SettingsStore, Target,
};
use picasastarter_xml::{paths, XmlStore, DEFAULT_KEEP};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Concrete console, platform and storage pieces the workflows run against.
pub struct Host {
    pub store: XmlStore,
    pub prompt: ConsolePrompt,
    pub selector: ConsoleSelector,
    pub mapper: SubstDriveMapper,
    pub probe: SysinfoProbe,
    pub runner: TokioRunner,
    pub interrupts: Interrupts,
}

impl Host {
    fn services(&mut self, cancel: Arc<AtomicBool>) -> Services<'_> {
        Services {
            store: &self.store,
            prompt: &mut self.prompt,
            selector: &mut self.selector,
            mapper: &mut self.mapper,
            probe: &self.probe,
            runner: &self.runner,
            cancel,
        }
    }
}

pub async fn run_app(args: Cli) -> Result<()> {
    let invocation = parse_directives(&args.directives);
    let mut prompt = ConsolePrompt;
    for w in &invocation.warnings {
        warn!(warning = %w, "command line");
        prompt.warn(w);
    }

    let store = match args.config_dir {
        Some(dir) => XmlStore::open_with(dir, DEFAULT_KEEP),
        None => XmlStore::open_default(),
    };
    let config_dir = store.config_dir().to_path_buf();
    let state = match load_state(&store, &config_dir, &mut prompt).await? {
        Startup::Ready(state) => state,
        Startup::Abort => {
            info!("startup aborted by user");
            return Ok(());
        }
    };

    let mut session = Session {
        settings: state.settings,
        settings_dir: state.settings_dir,
        local_app_data: paths::local_app_data(),
    };
    let interrupts = Interrupts::install();
    let mut host = Host {
        store,
        prompt,
        selector: ConsoleSelector::new(interrupts.clone()),
        mapper: SubstDriveMapper::new(),
        probe: SysinfoProbe,
        runner: TokioRunner,
        interrupts,
    };

    let commands = if state.first_run {
        first_run_setup(&mut host, &mut session).await?;
        if invocation.commands != [Command::Interactive] {
            host.prompt
                .info("Settings were just created; command line directives are skipped this time.");
        }
        vec![Command::Interactive]
    } else {
        invocation.commands
    };

    for cmd in commands {
        let carry_on = match cmd {
            Command::Autorun(target) => autorun_cmd(&mut host, &mut session, &target).await,
            Command::Backup(target) => backup_cmd(&mut host, &mut session, &target).await,
            Command::Interactive => {
                interactive::menu(&mut host, &mut session).await?;
                true
            }
        };
        if !carry_on {
            break;
        }
    }
    Ok(())
}

/// Asks where settings live, records it and makes sure a settings file exists.
async fn first_run_setup(host: &mut Host, session: &mut Session) -> Result<()> {
    let default = host.store.config_dir().to_path_buf();
    host.prompt.info("No PicasaStarter configuration yet.");
    host.prompt.info(
        "Choose the directory for the settings. Put it on a shared or removable drive to use the same databases on several computers.",
    );
    let answer = read_line(&format!("settings directory [{}]> ", default.display()))?;
    let dir = match answer.trim().trim_matches('"') {
        "" => default,
        other => PathBuf::from(other),
    };
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    host.store
        .save_config(&Config {
            settings_dir: Some(dir.clone()),
        })
        .await?;

    session.settings = match host.store.load_settings(&dir).await {
        Ok(mut existing) => {
            existing.ensure_default_profile();
            host.prompt
                .info(&format!("Using the settings already in {}.", dir.display()));
            existing
        }
        Err(CoreError::SettingsFileMissing(_)) => Settings::with_default_profile(),
        Err(e) => {
            warn!(error = %e, "existing settings unusable");
            host.prompt.warn(&e.to_string());
            Settings::with_default_profile()
        }
    };
    session.settings_dir = dir;
    workflow::persist(session, &host.store, &mut host.prompt).await;
    Ok(())
}

fn report_failure(host: &mut Host, e: &CoreError) {
    error!(error = %e, "command failed");
    let message = match e {
        CoreError::AlreadyRunning(_) => format!("{e}. Close Picasa before starting it on another database."),
        _ => e.to_string(),
    };
    host.prompt.warn(&message);
}

/// Runs `/autorun`; false stops any directives after it.
pub async fn autorun_cmd(host: &mut Host, session: &mut Session, target: &Target) -> bool {
    let cancel = host.interrupts.begin_launch();
    let result = workflow::autorun(session, &mut host.services(cancel), target).await;
    host.interrupts.idle();

    match result {
        Ok(RunOutcome::Finished { profile, button_errors }) => {
            if button_errors > 0 {
                host.prompt
                    .warn(&format!("{button_errors} button(s) could not be installed for {profile}."));
            }
            info!(profile = %profile, "Picasa session ended");
            true
        }
        Ok(RunOutcome::Cancelled) => false,
        Err(e) => {
            report_failure(host, &e);
            false
        }
    }
}

/// Runs `/backup`; false stops any directives after it.
pub async fn backup_cmd(host: &mut Host, session: &mut Session, target: &Target) -> bool {
    let cancel = host.interrupts.begin_backup();
    let today = Local::now().date_naive();
    let result = workflow::backup(session, &mut host.services(cancel), target, today).await;
    host.interrupts.idle();

    match result {
        Ok(BackupOutcome::Completed(report)) => {
            host.prompt.info(&format!(
                "Backup finished: {} files ({} bytes) in {}.",
                report.files,
                report.bytes,
                report.destination.display()
            ));
            true
        }
        Ok(BackupOutcome::Cancelled) | Ok(BackupOutcome::Failed(_)) => false,
        Err(e) => {
            report_failure(host, &e);
            false
        }
    }
}
