//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::activity::ActivityAction;
use crate::commands::baby::BabyAction;
use crate::commands::stats::StatsAction;
use crate::commands::timer::TimerAction;
use crate::commands::user::UserAction;

/// Baby activity tracker.
///
/// Logs feeds, pumping, diapers, sleep, growth, health records and milestones,
/// runs timers for feeds, pumping and sleep, and summarizes the day and week.
#[derive(Debug, Parser)]
#[command(name = "bt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Act as this user instead of the configured one.
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start, stop and list timers.
    Timer {
        #[command(subcommand)]
        action: TimerAction,
    },

    /// Daily, recent and weekly summaries.
    Stats {
        #[command(subcommand)]
        action: StatsAction,
    },

    /// Log and manage activities.
    Activity {
        #[command(subcommand)]
        action: ActivityAction,
    },

    /// Manage baby profiles.
    Baby {
        #[command(subcommand)]
        action: BabyAction,
    },

    /// Register or remove users.
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_negative_tz_offset() {
        let cli = Cli::try_parse_from([
            "bt",
            "--user",
            "sam",
            "stats",
            "daily",
            "--tz-offset",
            "-330",
        ])
        .unwrap();
        assert_eq!(cli.user.as_deref(), Some("sam"));
        let Some(Commands::Stats {
            action: StatsAction::Daily(args),
        }) = cli.command
        else {
            panic!("expected stats daily");
        };
        assert_eq!(args.tz_offset, Some(-330));
    }

    #[test]
    fn rejects_unknown_activity_type() {
        let err = Cli::try_parse_from(["bt", "timer", "start", "nap"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn bare_wet_flag_means_true() {
        let cli = Cli::try_parse_from([
            "bt", "activity", "add", "diaper", "--wet", "--dirty", "false",
        ])
        .unwrap();
        let Some(Commands::Activity {
            action: ActivityAction::Add(args),
        }) = cli.command
        else {
            panic!("expected activity add");
        };
        assert_eq!(args.detail.wet, Some(true));
        assert_eq!(args.detail.dirty, Some(false));
    }
}
