// Drift detection
pub mod check;
pub mod watch;

// Inspection
pub mod config;
pub mod scan;

use anyhow::{Context, Result};
use driftkit::provider::{AwsCliProvider, FileProvider, Provider};
use driftkit::{CancelToken, Logger, Reconciler};
use std::sync::Arc;

use crate::config::Settings;

/// Unwrap settings resolved in `main` for commands that need them.
pub fn require(settings: Option<Settings>) -> Result<Settings> {
    settings.context("Settings were not loaded for this command")
}

/// Build a reconciler from validated settings.
pub fn build_reconciler(settings: &Settings) -> Result<Reconciler> {
    settings.validate().context("Invalid settings")?;

    let provider: Arc<dyn Provider> = match settings.describe_file() {
        Some(path) => {
            log::info!("Reading live instance from {}", path.display());
            Arc::new(FileProvider::new(path))
        }
        None => Arc::new(AwsCliProvider::new(settings.aws_options())),
    };

    Ok(Reconciler::new(
        provider,
        settings.tfstate_path(),
        settings.maintf_path(),
        settings.reconcile_options(),
        Logger::global(),
    ))
}

/// Cancel `cancel` on Ctrl-C or SIGTERM.
pub fn cancel_on_shutdown(cancel: &CancelToken) {
    let cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        log::info!("Shutdown requested");
        cancel.cancel();
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("Could not listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                log::warn!("Could not listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
