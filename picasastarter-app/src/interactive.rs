use crate::cli::commands::{autorun_cmd, backup_cmd, Host};
use crate::console::{pick, read_line, render_choices};
use anyhow::Result;
use picasastarter_core::workflow::{self, Session};
use picasastarter_core::{
    CoreError, Profile, Prompt, Selection, Settings, Target, VirtualDrive, DEFAULT_PICASA_EXE,
};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MenuChoice {
    List,
    Run,
    Backup,
    Add,
    Remove,
    SetExe,
    Quit,
}

pub fn parse_choice(line: &str) -> Option<MenuChoice> {
    match line.trim().to_lowercase().as_str() {
        "1" | "l" | "list" => Some(MenuChoice::List),
        "2" | "r" | "run" => Some(MenuChoice::Run),
        "3" | "b" | "backup" => Some(MenuChoice::Backup),
        "4" | "a" | "add" => Some(MenuChoice::Add),
        "5" | "d" | "remove" => Some(MenuChoice::Remove),
        "6" | "e" | "exe" => Some(MenuChoice::SetExe),
        "q" | "quit" | "exit" => Some(MenuChoice::Quit),
        _ => None,
    }
}

fn print_menu(session: &Session) {
    println!();
    println!("PicasaStarter (settings in {})", session.settings_dir.display());
    println!("  1) list databases");
    println!("  2) run Picasa on a database");
    println!("  3) back up a database");
    println!("  4) add a database");
    println!("  5) remove a database");
    println!("  6) set the Picasa executable ({})", session.settings.picasa_exe().display());
    println!("  q) quit");
}

/// Interactive loop; every edit is saved right away.
pub async fn menu(host: &mut Host, session: &mut Session) -> Result<()> {
    loop {
        print_menu(session);
        let line = read_line("> ")?;
        // Closed stdin ends the session.
        if line.is_empty() {
            return Ok(());
        }
        let Some(choice) = parse_choice(&line) else {
            println!("enter 1-6 or q");
            continue;
        };
        match choice {
            MenuChoice::List => print!("{}", render_choices(&session.settings.profiles, true)),
            MenuChoice::Run => {
                autorun_cmd(host, session, &Target::AskUser).await;
            }
            MenuChoice::Backup => {
                backup_cmd(host, session, &Target::AskUser).await;
            }
            MenuChoice::Add => {
                if let Some(profile) = ask_new_profile()? {
                    add_profile(host, session, profile).await;
                }
            }
            MenuChoice::Remove => remove_profile(host, session).await?,
            MenuChoice::SetExe => set_exe(host, session).await?,
            MenuChoice::Quit => return Ok(()),
        }
    }
}

fn optional(answer: String) -> Option<String> {
    let trimmed = answer.trim().trim_matches('"');
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn ask_new_profile() -> Result<Option<Profile>> {
    let Some(name) = optional(read_line("name (empty to cancel)> ")?) else {
        return Ok(None);
    };
    let Some(base) = optional(read_line("directory to keep the database in> ")?) else {
        println!("a database needs a directory");
        return Ok(None);
    };
    let mut profile = Profile::custom(name, base);
    profile.description = optional(read_line("description (optional)> ")?);
    profile.backup_dir = optional(read_line("backup directory (optional)> ")?).map(PathBuf::from);
    if let Some(letter) = optional(read_line("virtual drive letter (optional)> ")?) {
        let path = optional(read_line("directory to map onto the drive> ")?).unwrap_or_default();
        profile.virtual_drive = Some(VirtualDrive {
            letter,
            path: PathBuf::from(path),
        });
    }
    Ok(Some(profile))
}

async fn add_profile(host: &mut Host, session: &mut Session, profile: Profile) {
    match admit_profile(&mut session.settings, profile) {
        Ok(()) => {
            workflow::persist(session, &host.store, &mut host.prompt).await;
        }
        Err(e) => host.prompt.warn(&e.to_string()),
    }
}

/// Adds the profile unless its name is taken or its drive letter is unusable.
fn admit_profile(settings: &mut Settings, profile: Profile) -> Result<(), CoreError> {
    if let Some(drive) = &profile.virtual_drive {
        drive.drive_spec()?;
    }
    settings.add_profile(profile)
}

async fn remove_profile(host: &mut Host, session: &mut Session) -> Result<()> {
    print!("{}", render_choices(&session.settings.profiles, false));
    let answer = read_line("database to remove (empty to cancel)> ")?;
    let Selection::Chosen(name) = pick(&session.settings.profiles, &answer) else {
        return Ok(());
    };
    if !host
        .prompt
        .confirm(&format!("Remove {name} from the list? The photos and database stay on disk."))
    {
        return Ok(());
    }
    match session.settings.remove_profile(&name) {
        Ok(removed) => {
            info!(profile = %removed.name, "database removed");
            workflow::persist(session, &host.store, &mut host.prompt).await;
        }
        Err(e) => host.prompt.warn(&e.to_string()),
    }
    Ok(())
}

async fn set_exe(host: &mut Host, session: &mut Session) -> Result<()> {
    let current = session.settings.picasa_exe();
    let Some(answer) = optional(read_line(&format!("Picasa executable [{}]> ", current.display()))?) else {
        return Ok(());
    };
    let exe = PathBuf::from(answer);
    if !exe.is_file() && !host.prompt.confirm(&format!("{} does not exist. Use it anyway?", exe.display())) {
        return Ok(());
    }
    apply_exe(&mut session.settings, exe);
    workflow::persist(session, &host.store, &mut host.prompt).await;
    Ok(())
}

/// Stores the executable, clearing the override when it equals the default.
pub fn apply_exe(settings: &mut Settings, exe: PathBuf) {
    settings.picasa_exe_path = (exe.as_path() != Path::new(DEFAULT_PICASA_EXE)).then_some(exe);
}
