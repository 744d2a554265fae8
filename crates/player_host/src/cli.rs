//! Command-line interface for the player host.

use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_PATH: &str = "player.toml";

/// Command line arguments parsed from user input.
///
/// Each option overrides the matching configuration file setting.
#[derive(Debug, Clone)]
pub struct CliArgs {
    pub config_path: PathBuf,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
}

pub fn command() -> Command {
    Command::new("Player Host")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Runs a scripted player session against the plugin core")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value(DEFAULT_CONFIG_PATH),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(ArgAction::SetTrue),
        )
}

impl CliArgs {
    /// Parses the process arguments.
    ///
    /// # Returns
    ///
    /// A `CliArgs` instance with the config path defaulting to
    /// [`DEFAULT_CONFIG_PATH`].
    ///
    /// On invalid input clap prints the usage and exits the process.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    pub fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        let matches = command().try_get_matches_from(args.iter().copied()).unwrap();
        CliArgs::from_matches(&matches)
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["player_host"]);
        assert_eq!(args.config_path, PathBuf::from("player.toml"));
        assert!(args.log_level.is_none());
        assert!(!args.json_logs);
    }

    #[test]
    fn test_overrides() {
        let args = parse(&["player_host", "-c", "/etc/player.toml", "--log-level", "debug", "--json-logs"]);
        assert_eq!(args.config_path, PathBuf::from("/etc/player.toml"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.json_logs);
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        assert!(command().try_get_matches_from(["player_host", "--bind", "x"]).is_err());
    }
}
