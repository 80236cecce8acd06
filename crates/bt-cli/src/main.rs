use std::io::Write;
use std::process::ExitCode;

use anyhow::{Context, Result};
use bt_cli::commands::{activity, baby, stats, timer, user};
use bt_cli::{Cli, Commands, Config, classify, exit_code};
use bt_db::ErrorKind;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so `--json` output stays parseable
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let kind = classify(&err);
            if kind == Some(ErrorKind::Internal) {
                tracing::error!(error = ?err, "command failed");
                eprintln!("error: internal error, rerun with --verbose for details");
            } else {
                eprintln!("error: {err:#}");
            }
            ExitCode::from(exit_code(kind))
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut config =
        Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(user) = &cli.user {
        config.user = Some(user.clone());
    }
    tracing::debug!(?config, "loaded configuration");

    let mut stdout = std::io::stdout().lock();
    match &cli.command {
        Some(Commands::Timer { action }) => timer::run(&mut stdout, action, &config),
        Some(Commands::Stats { action }) => stats::run(&mut stdout, action, &config),
        Some(Commands::Activity { action }) => activity::run(&mut stdout, action, &config),
        Some(Commands::Baby { action }) => baby::run(&mut stdout, action, &config),
        Some(Commands::User { action }) => user::run(&mut stdout, action, &config),
        None => {
            // No subcommand, show help
            Cli::command().print_help()?;
            writeln!(stdout)?;
            Ok(())
        }
    }
}
