use anyhow::{Context as _, Result};
use driftkit::CancelToken;
use std::process::ExitCode;

use crate::Context;
use crate::cli::CheckArgs;
use crate::commands::{build_reconciler, cancel_on_shutdown};
use crate::config::Settings;
use crate::ui;

/// Exit status of `check --exit-code` when drift is found.
const DRIFT_EXIT_CODE: u8 = 2;

pub async fn run(ctx: &Context, args: CheckArgs, settings: Settings) -> Result<ExitCode> {
    let reconciler = build_reconciler(&settings)?;
    let cancel = CancelToken::new();
    cancel_on_shutdown(&cancel);

    if ctx.verbose > 0 && !args.json {
        ui::kv("State", &settings.tfstate_path().display().to_string());
        ui::kv("Config", &settings.maintf_path().display().to_string());
        ui::kv("Resource", &settings.resource_type);
        println!();
    }

    let report = match reconciler.run_cycle(&cancel).await {
        Ok(report) => report,
        Err(e) => {
            let category = e.category();
            if !args.json {
                ui::error(&format!("{}: {e}", category.description()));
                ui::dim(category.advice());
            }
            return Err(e.into());
        }
    };

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{json}");
    } else {
        ui::cycle_report(&report);
    }

    if args.exit_code && report.has_drift() {
        Ok(ExitCode::from(DRIFT_EXIT_CODE))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
