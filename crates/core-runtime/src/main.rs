//! # Desk Companion Core
//!
//! Entry point for the runtime backbone: resource monitoring, the plugin
//! host, and the realtime gateway, all wired over the shared event bus
//! and supervised by the service orchestrator.

use anyhow::Result;
use core_runtime::{attach_signal_handlers, initialize_core, CoreConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = CoreConfig::from_env();
    let runtime = initialize_core(config).await?;

    info!("Core is running. Press Ctrl+C to stop.");
    let signals = attach_signal_handlers(runtime.orchestrator());
    signals.await?;

    Ok(())
}
