mod cli;
mod commands;
mod config;
mod paths;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use config::Settings;
use std::io;
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let settings = match cli.command.settings_args() {
        Some(overrides) => Some(Settings::resolve(cli.config.as_deref(), overrides)?),
        None => None,
    };

    // -v flags win over the configured level
    let log_level = match cli.verbose {
        0 => match &settings {
            Some(settings) => settings.log_filter()?,
            None => log::LevelFilter::Warn,
        },
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    match cli.command {
        Command::Watch(_) => {
            commands::watch::run(&ctx, commands::require(settings)?).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Check(args) => commands::check::run(&ctx, args, commands::require(settings)?).await,
        Command::Scan(args) => {
            commands::scan::run(&ctx, args).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Config(cmd) => {
            commands::config::run(&ctx, cmd, settings, cli.config.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "driftwatch", &mut io::stdout());
            Ok(ExitCode::SUCCESS)
        }
    }
}
