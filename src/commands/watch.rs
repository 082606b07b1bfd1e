use anyhow::Result;
use driftkit::{CancelToken, CycleReport, LogReports, Logger, LoopState, ReportSink};

use crate::Context;
use crate::commands::{build_reconciler, cancel_on_shutdown};
use crate::config::Settings;
use crate::ui;

/// Prints each report and mirrors it to the log.
struct Printer {
    quiet: bool,
    log: LogReports,
}

impl ReportSink for Printer {
    fn on_report(&self, report: &CycleReport) {
        self.log.on_report(report);
        if !self.quiet || report.has_drift() {
            ui::cycle_report(report);
        }
    }

    fn on_state(&self, state: LoopState) {
        self.log.on_state(state);
    }
}

pub async fn run(ctx: &Context, settings: Settings) -> Result<()> {
    let reconciler = build_reconciler(&settings)?;
    let cancel = CancelToken::new();
    cancel_on_shutdown(&cancel);

    if !ctx.quiet {
        ui::info(&format!(
            "Watching {} and {} every {}s (Ctrl-C to stop)",
            settings.tfstate_path().display(),
            settings.maintf_path().display(),
            settings.check_interval_seconds
        ));
    }

    let printer = Printer {
        quiet: ctx.quiet,
        log: LogReports(Logger::global().scoped("driftwatch")),
    };

    match reconciler.run(&cancel, &printer).await {
        Ok(()) => {
            ui::dim("Stopped");
            Ok(())
        }
        Err(e) if e.is_cancelled() && cancel.is_cancelled() => {
            ui::dim("Stopped while a check was in progress");
            Ok(())
        }
        Err(e) => {
            let category = e.category();
            ui::error(&format!("{}: {e}", category.description()));
            ui::dim(category.advice());
            Err(e.into())
        }
    }
}
