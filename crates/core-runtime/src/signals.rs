//! Shutdown signal handling.
//!
//! Nothing is installed implicitly; the composition root opts in by
//! calling [`attach_signal_handlers`] after the core is running.

use crate::orchestrator::ServiceOrchestrator;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Listen for ctrl-c or SIGTERM, stop every service, then exit the
/// process: 0 when shutdown completed, non-zero when it errored.
pub fn attach_signal_handlers(orchestrator: Arc<ServiceOrchestrator>) -> JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown signal received");

        match orchestrator.stop().await {
            Ok(()) => {
                info!("Shutdown complete");
                std::process::exit(0);
            }
            Err(e) => {
                error!(error = %e, "Shutdown failed");
                std::process::exit(1);
            }
        }
    })
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            error!(error = %e, "Cannot install SIGTERM handler, listening for ctrl-c only");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
