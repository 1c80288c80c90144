//! Composition root: builds the bus and the three standard services,
//! wires their dependency edges, and drives them through the
//! orchestrator.

use crate::config::CoreConfig;
use crate::orchestrator::ServiceOrchestrator;
use anyhow::{Context, Result};
use plugin_host::PluginHost;
use realtime_gateway::RealtimeGateway;
use resource_monitor::ResourceMonitor;
use shared_bus::EventBus;
use shared_types::event::event_types;
use shared_types::{EventPayload, EventPriority, Service};
use std::sync::Arc;
use tracing::{error, info};

/// Names the standard services are registered under.
pub mod service_names {
    pub const RESOURCE_MONITOR: &str = "resource-monitor";
    pub const REALTIME_GATEWAY: &str = "realtime-gateway";
    pub const PLUGIN_HOST: &str = "plugin-host";
}

/// A fully wired, running core.
pub struct CoreRuntime {
    bus: Arc<EventBus>,
    orchestrator: Arc<ServiceOrchestrator>,
    resource_monitor: Arc<ResourceMonitor>,
    gateway: Arc<RealtimeGateway>,
    plugin_host: Arc<PluginHost>,
}

impl CoreRuntime {
    #[must_use]
    pub fn bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.bus)
    }

    #[must_use]
    pub fn orchestrator(&self) -> Arc<ServiceOrchestrator> {
        Arc::clone(&self.orchestrator)
    }

    #[must_use]
    pub fn resource_monitor(&self) -> Arc<ResourceMonitor> {
        Arc::clone(&self.resource_monitor)
    }

    #[must_use]
    pub fn gateway(&self) -> Arc<RealtimeGateway> {
        Arc::clone(&self.gateway)
    }

    #[must_use]
    pub fn plugin_host(&self) -> Arc<PluginHost> {
        Arc::clone(&self.plugin_host)
    }
}

/// Build and bring up the core: bus, services, dependency edges,
/// `initialize()`, `start()`.
pub async fn initialize_core(config: CoreConfig) -> Result<CoreRuntime> {
    info!("Initializing desk companion core");

    let bus = Arc::new(EventBus::new());
    let resource_monitor = Arc::new(ResourceMonitor::new(Arc::clone(&bus), config.resources));
    let gateway = Arc::new(RealtimeGateway::new(Arc::clone(&bus), config.gateway));
    let plugin_host = Arc::new(PluginHost::new(Arc::clone(&bus), config.plugins));

    let orchestrator = Arc::new(ServiceOrchestrator::new());
    orchestrator.register_service(
        service_names::RESOURCE_MONITOR,
        Arc::clone(&resource_monitor) as Arc<dyn Service>,
        &[],
    )?;
    orchestrator.register_service(
        service_names::REALTIME_GATEWAY,
        Arc::clone(&gateway) as Arc<dyn Service>,
        &[service_names::RESOURCE_MONITOR],
    )?;
    orchestrator.register_service(
        service_names::PLUGIN_HOST,
        Arc::clone(&plugin_host) as Arc<dyn Service>,
        &[
            service_names::RESOURCE_MONITOR,
            service_names::REALTIME_GATEWAY,
        ],
    )?;

    orchestrator
        .initialize()
        .await
        .context("core initialization failed")?;
    orchestrator.start().await.context("core startup failed")?;

    bus.publish(
        event_types::SYSTEM_STATUS,
        EventPayload::Opaque(serde_json::json!({ "status": "running" })),
        EventPriority::Normal,
    );
    info!("Desk companion core is running");

    Ok(CoreRuntime {
        bus,
        orchestrator,
        resource_monitor,
        gateway,
        plugin_host,
    })
}

/// Stop the core. Shutdown errors are logged, never propagated.
pub async fn shutdown_core(runtime: &CoreRuntime) {
    info!("Shutting down desk companion core");
    runtime.bus.publish(
        event_types::SYSTEM_STATUS,
        EventPayload::Opaque(serde_json::json!({ "status": "stopping" })),
        EventPriority::Normal,
    );
    if let Err(e) = runtime.orchestrator.stop().await {
        error!(error = %e, "Core shutdown reported an error");
    }
}
