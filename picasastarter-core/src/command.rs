use crate::{ASK_USER, PERSONAL_PROFILE};

/// Which database a directive points at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    Personal,
    AskUser,
    Named(String),
}

impl Target {
    pub fn parse(raw: &str) -> Self {
        let name = raw.trim_matches(|c| c == '"' || c == ' ');
        if name.eq_ignore_ascii_case(ASK_USER) {
            Target::AskUser
        } else if name.eq_ignore_ascii_case(PERSONAL_PROFILE) {
            Target::Personal
        } else {
            Target::Named(name.to_string())
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Autorun(Target),
    Backup(Target),
    Interactive,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Invocation {
    pub commands: Vec<Command>,
    pub warnings: Vec<String>,
}

/// Parses `/autorun <db>` and `/backup <db>` directives.
///
/// Autorun always runs before backup regardless of argument order. Any
/// switch, even one missing its database name, suppresses the interactive
/// front-end. Unknown arguments only produce a warning.
pub fn parse_directives<I, S>(args: I) -> Invocation
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_string()).collect();
    let mut out = Invocation::default();
    let mut autorun = None;
    let mut backup = None;
    let mut saw_switch = false;

    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        let switch = arg.strip_prefix('/').unwrap_or_default();
        let slot = if switch.eq_ignore_ascii_case("autorun") {
            Some(&mut autorun)
        } else if switch.eq_ignore_ascii_case("backup") {
            Some(&mut backup)
        } else {
            None
        };

        match slot {
            Some(slot) => {
                saw_switch = true;
                i += 1;
                match args.get(i) {
                    Some(name) => *slot = Some(Target::parse(name)),
                    None => out.warnings.push(format!(
                        "The /{} directive should be followed by an existing Picasa database name, or \"{}\" or \"{}\"",
                        switch.to_lowercase(),
                        PERSONAL_PROFILE,
                        ASK_USER
                    )),
                }
            }
            None => out
                .warnings
                .push(format!("Invalid or no command line parameter: {arg}")),
        }
        i += 1;
    }

    if let Some(t) = autorun {
        out.commands.push(Command::Autorun(t));
    }
    if let Some(t) = backup {
        out.commands.push(Command::Backup(t));
    }
    if !saw_switch {
        out.commands.push(Command::Interactive);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_arguments_means_interactive() {
        let inv = parse_directives(Vec::<String>::new());
        assert_eq!(inv.commands, vec![Command::Interactive]);
        assert!(inv.warnings.is_empty());
    }

    #[test]
    fn switches_are_case_insensitive_and_names_trimmed() {
        let inv = parse_directives(["/AUTORUN", "\" Family \""]);
        assert_eq!(inv.commands, vec![Command::Autorun(Target::Named("Family".into()))]);

        let inv = parse_directives(["/backup", "askuser"]);
        assert_eq!(inv.commands, vec![Command::Backup(Target::AskUser)]);

        let inv = parse_directives(["/Backup", "PERSONAL"]);
        assert_eq!(inv.commands, vec![Command::Backup(Target::Personal)]);
    }

    #[test]
    fn autorun_runs_before_backup() {
        let inv = parse_directives(["/backup", "Work", "/autorun", "Personal"]);
        assert_eq!(
            inv.commands,
            vec![
                Command::Autorun(Target::Personal),
                Command::Backup(Target::Named("Work".into())),
            ]
        );
    }

    #[test]
    fn unknown_arguments_warn_but_are_ignored() {
        let inv = parse_directives(["/frobnicate", "/autorun", "Work"]);
        assert_eq!(inv.commands, vec![Command::Autorun(Target::Named("Work".into()))]);
        assert_eq!(inv.warnings.len(), 1);
        assert!(inv.warnings[0].contains("/frobnicate"));
    }

    #[test]
    fn switch_without_name_warns_and_skips_interactive() {
        let inv = parse_directives(["/autorun"]);
        assert!(inv.commands.is_empty());
        assert_eq!(inv.warnings.len(), 1);
        assert!(inv.warnings[0].contains("/autorun"));
    }

    #[test]
    fn only_a_single_slash_makes_a_switch() {
        let inv = parse_directives(["-autorun", "Work", "--backup", "Work", "//autorun", "Work"]);
        assert_eq!(inv.commands, vec![Command::Interactive]);
        assert_eq!(inv.warnings.len(), 6);
    }

    #[test]
    fn bare_word_is_not_a_switch() {
        let inv = parse_directives(["autorun", "Work"]);
        assert_eq!(inv.commands, vec![Command::Interactive]);
        assert_eq!(inv.warnings.len(), 2);
    }
}
