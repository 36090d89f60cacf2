use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "picasastarter",
    version,
    about = "Run Picasa on one of several photo databases",
    after_help = "Directives:\n  /autorun <name|Personal|AskUser>  start Picasa on a database\n  /backup <name|Personal|AskUser>   back up a database\n\nWithout a directive the interactive menu starts."
)]
pub struct Cli {
    /// Directory holding PicasaStarterConfig.xml (defaults to the per-user config dir)
    #[arg(long)]
    pub config_dir: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// `/autorun` and `/backup` directives
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub directives: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_keep_their_slashes() {
        let cli = Cli::parse_from(["picasastarter", "-v", "/autorun", "Family", "/backup", "AskUser"]);
        assert_eq!(cli.verbose, 1);
        assert_eq!(cli.directives, ["/autorun", "Family", "/backup", "AskUser"]);
        assert!(cli.config_dir.is_none());
    }

    #[test]
    fn config_dir_is_optional() {
        let cli = Cli::parse_from(["picasastarter", "--config-dir", "/tmp/ps"]);
        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/ps")));
        assert!(cli.directives.is_empty());
    }
}
