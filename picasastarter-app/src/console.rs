use anyhow::Result;
use picasastarter_core::{MissingSettings, Profile, ProfileSelector, Prompt, Selection};
use crate::signals::Interrupts;
use std::io::{stdin, stdout, Write};
use std::path::Path;

pub fn read_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    stdout().flush().ok();
    let mut s = String::new();
    stdin().read_line(&mut s)?;
    Ok(s)
}

/// Reads a line, treating a closed stdin as an empty answer.
fn ask(prompt: &str) -> String {
    read_line(prompt).map(|s| s.trim().to_string()).unwrap_or_default()
}

/// Console questions and notices on stdin/stdout.
#[derive(Debug, Default)]
pub struct ConsolePrompt;

impl Prompt for ConsolePrompt {
    fn info(&mut self, message: &str) {
        println!("{message}");
    }

    fn warn(&mut self, message: &str) {
        eprintln!("warning: {message}");
    }

    fn confirm(&mut self, question: &str) -> bool {
        loop {
            match ask(&format!("{question} [y/n] ")).to_lowercase().as_str() {
                "y" | "yes" => return true,
                "n" | "no" | "" => return false,
                _ => println!("enter y or n"),
            }
        }
    }

    fn missing_settings(&mut self, settings_dir: &Path) -> MissingSettings {
        println!("The settings directory {} cannot be reached.", settings_dir.display());
        println!("If it is on a removable or network drive, connect it and choose Y to look again.");
        println!("N sets up a new settings location, C quits.");
        loop {
            match ask("[Y/N/C] ").to_lowercase().as_str() {
                "y" | "yes" => return MissingSettings::Retry,
                "n" | "no" => return MissingSettings::Relocate,
                "c" | "cancel" | "" => return MissingSettings::Abort,
                _ => println!("enter Y, N or C"),
            }
        }
    }
}

/// Numbered database chooser.
#[derive(Debug)]
pub struct ConsoleSelector {
    interrupts: Interrupts,
}

impl ConsoleSelector {
    pub fn new(interrupts: Interrupts) -> Self {
        Self { interrupts }
    }
}

impl ProfileSelector for ConsoleSelector {
    fn select(&mut self, profiles: &[Profile], for_backup: bool) -> Selection {
        print!("{}", render_choices(profiles, for_backup));
        let verb = if for_backup { "back up" } else { "open" };
        let answer = ask(&format!("database to {verb} (number or name, empty to cancel)> "));
        self.interrupts.selection_done();
        pick(profiles, &answer)
    }
}

pub fn render_choices(profiles: &[Profile], for_backup: bool) -> String {
    let mut out = String::new();
    for (i, p) in profiles.iter().enumerate() {
        let mut line = format!("{:>3}. {}", i + 1, p.name);
        if let Some(desc) = p.description.as_deref().filter(|d| !d.is_empty()) {
            line.push_str(&format!(" - {desc}"));
        }
        if for_backup {
            match p.last_backup_date {
                Some(d) => line.push_str(&format!("  (last backup {d})")),
                None => line.push_str("  (never backed up)"),
            }
        }
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// Maps an answer to a profile name; unknown input cancels.
pub fn pick(profiles: &[Profile], answer: &str) -> Selection {
    let answer = answer.trim();
    if answer.is_empty() || answer.eq_ignore_ascii_case("q") {
        return Selection::Cancelled;
    }
    if let Ok(n) = answer.parse::<usize>() {
        return match n.checked_sub(1).and_then(|i| profiles.get(i)) {
            Some(p) => Selection::Chosen(p.name.clone()),
            None => Selection::Cancelled,
        };
    }
    match profiles.iter().find(|p| p.matches(answer)) {
        Some(p) => Selection::Chosen(p.name.clone()),
        None => Selection::Cancelled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn profiles() -> Vec<Profile> {
        let mut family = Profile::custom("Family", "/photos/family");
        family.last_backup_date = NaiveDate::from_ymd_opt(2024, 3, 1);
        vec![Profile::personal(), family]
    }

    #[test]
    fn pick_by_number_or_name() {
        let p = profiles();
        assert_eq!(pick(&p, "2"), Selection::Chosen("Family".into()));
        assert_eq!(pick(&p, " family "), Selection::Chosen("Family".into()));
        assert_eq!(pick(&p, "1"), Selection::Chosen("Personal".into()));
    }

    #[test]
    fn empty_quit_or_unknown_cancels() {
        let p = profiles();
        for answer in ["", "q", "Q", "0", "7", "Holiday"] {
            assert_eq!(pick(&p, answer), Selection::Cancelled, "answer {answer:?}");
        }
    }

    #[test]
    fn backup_listing_shows_dates() {
        let text = render_choices(&profiles(), true);
        assert!(text.contains("2. Family"));
        assert!(text.contains("last backup 2024-03-01"));
        assert!(text.contains("never backed up"));
        assert!(!render_choices(&profiles(), false).contains("backup"));
    }
}
