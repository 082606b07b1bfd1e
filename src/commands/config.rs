use anyhow::Result;
use std::path::Path;

use crate::Context;
use crate::cli::ConfigCommand;
use crate::commands::require;
use crate::config::Settings;
use crate::paths;
use crate::ui;

pub fn run(
    _ctx: &Context,
    cmd: ConfigCommand,
    settings: Option<Settings>,
    config_flag: Option<&Path>,
) -> Result<()> {
    match cmd {
        ConfigCommand::Show { .. } => show(&require(settings)?, config_flag),
        ConfigCommand::Validate { .. } => validate(&require(settings)?),
        ConfigCommand::Path => path(config_flag),
    }
}

fn show(settings: &Settings, config_flag: Option<&Path>) -> Result<()> {
    let (file, origin) = paths::config_file(config_flag)?;
    ui::header("Effective Settings");
    ui::kv("Settings file", &format!("{} ({origin})", file.display()));
    if !file.exists() {
        ui::dim("Settings file not found, defaults and overrides only");
    }
    println!();
    print!("{}", settings.to_toml()?);
    Ok(())
}

fn validate(settings: &Settings) -> Result<()> {
    match settings.validate() {
        Ok(()) => {
            ui::success("Settings are valid");
            Ok(())
        }
        Err(e) => {
            ui::error(&format!("{e}"));
            Err(e)
        }
    }
}

fn path(config_flag: Option<&Path>) -> Result<()> {
    let (file, _) = paths::config_file(config_flag)?;
    println!("{}", file.display());
    Ok(())
}
