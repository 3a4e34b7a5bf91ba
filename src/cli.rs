//! Command-line interface definitions

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "screendim",
    about = "Dim individual monitors with click-through overlays",
    version
)]
pub struct Cli {
    /// trace, debug, info, warn or error
    #[arg(long, global = true, default_value = "info", value_name = "LEVEL")]
    pub log_level: String,

    /// Control socket path (defaults to $XDG_RUNTIME_DIR/screendim/control.sock)
    #[arg(long, global = true, value_name = "PATH")]
    pub socket: Option<PathBuf>,

    /// Defaults to `run`
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the dimmer daemon
    Run(RunArgs),
    /// Show every screen record and the current mode
    List,
    /// Dim each screen separately or the whole desktop at once
    Mode {
        #[arg(value_enum)]
        mode: Mode,
    },
    /// Set a screen's opacity (clamped to 0.05..=0.9)
    Opacity {
        /// Output name, or `basic` for the whole desktop
        name: String,
        value: f64,
    },
    /// Turn dimming on for a screen
    Show { name: String },
    /// Turn dimming off for a screen
    Hide { name: String },
    /// Pick up newly attached monitors
    Detect,
    /// Forget per-screen settings and start over from the attached monitors
    Reset,
    /// Write settings to disk now
    Save,
    /// Stop the daemon
    Quit {
        /// Drop unsaved changes instead of writing them
        #[arg(long)]
        discard: bool,
    },
    /// Check that the daemon is alive
    Ping,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Settings file (defaults to settings.json in the working directory)
    #[arg(long, value_name = "PATH")]
    pub settings: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// One overlay per monitor
    Separate,
    /// One overlay covering every monitor
    Aggregate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_run() {
        let cli = Cli::try_parse_from(["screendim"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_parse_client_commands() {
        let cli = Cli::try_parse_from(["screendim", "opacity", "DP-1", "0.5"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Opacity { ref name, value }) if name == "DP-1" && value == 0.5
        ));

        let cli = Cli::try_parse_from(["screendim", "mode", "aggregate", "--log-level", "debug"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Mode { mode: Mode::Aggregate })));
        assert_eq!(cli.log_level, "debug");

        let cli = Cli::try_parse_from(["screendim", "quit", "--discard"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Quit { discard: true })));
    }

    #[test]
    fn test_run_settings_override() {
        let cli = Cli::try_parse_from(["screendim", "run", "--settings", "/tmp/dim.json"]).unwrap();
        match cli.command {
            Some(Command::Run(args)) => {
                assert_eq!(args.settings, Some(PathBuf::from("/tmp/dim.json")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["screendim", "mode", "mirror"]).is_err());
    }
}
