//! # Resource Monitor Service
//!
//! Periodic sampling plus the threshold policy table. Per tick:
//!
//! | Condition                | Action                                              |
//! |--------------------------|-----------------------------------------------------|
//! | CPU >= critical          | `resource.cpu.critical` + aggressive throttle       |
//! | CPU >= warning           | `resource.cpu.warning` + light throttle             |
//! | Memory >= critical       | `resource.memory.critical` + cache-clear broadcast  |
//! | Memory >= warning        | `resource.memory.warning`                           |
//!
//! Critical takes precedence over warning per axis; `resource.metrics` is
//! published unconditionally every tick.

use crate::probe::{ResourceProbe, ResourceSample, SysinfoProbe};
use crate::DEFAULT_CHECK_INTERVAL_SECS;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_bus::EventBus;
use shared_types::event::event_types;
use shared_types::{EventPayload, EventPriority, Service, ServiceError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Component name stamped on published events.
const SOURCE: &str = "resource-monitor";

/// Fixed thresholds for the policy table.
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    /// CPU warning threshold in single-core percent.
    pub cpu_warning: f64,
    /// CPU critical threshold in single-core percent.
    pub cpu_critical: f64,
    /// Memory warning threshold in megabytes.
    pub memory_warning_mb: u64,
    /// Memory critical threshold in megabytes.
    pub memory_critical_mb: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        // The companion targets a <1% CPU / <50MB footprint; warnings fire
        // at 80% of each budget.
        Self {
            cpu_warning: 0.8,
            cpu_critical: 1.0,
            memory_warning_mb: 40,
            memory_critical_mb: 50,
        }
    }
}

/// Monitor configuration.
#[derive(Debug, Clone, Copy)]
pub struct ResourceConfig {
    /// Sampling interval.
    pub check_interval: Duration,
    /// Policy thresholds.
    pub thresholds: Thresholds,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(DEFAULT_CHECK_INTERVAL_SECS),
            thresholds: Thresholds::default(),
        }
    }
}

/// Degradation callbacks registered by a throttleable component.
#[derive(Default)]
pub struct ThrottleHooks {
    /// Invoked on light throttle broadcasts.
    pub light: Option<Box<dyn Fn() + Send + Sync>>,
    /// Invoked on aggressive throttle broadcasts.
    pub aggressive: Option<Box<dyn Fn() + Send + Sync>>,
}

struct MonitorInner {
    bus: Arc<EventBus>,
    config: ResourceConfig,
    probe: Mutex<Box<dyn ResourceProbe>>,
    throttleable: Mutex<HashMap<String, ThrottleHooks>>,
    latest: Mutex<Option<ResourceSample>>,
}

/// The resource monitoring service.
pub struct ResourceMonitor {
    inner: Arc<MonitorInner>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ResourceMonitor {
    /// Create a monitor with the real sysinfo-backed probe.
    #[must_use]
    pub fn new(bus: Arc<EventBus>, config: ResourceConfig) -> Self {
        Self::with_probe(bus, config, Box::new(SysinfoProbe::new()))
    }

    /// Create a monitor with a custom probe (scripted probes in tests).
    #[must_use]
    pub fn with_probe(
        bus: Arc<EventBus>,
        config: ResourceConfig,
        probe: Box<dyn ResourceProbe>,
    ) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                bus,
                config,
                probe: Mutex::new(probe),
                throttleable: Mutex::new(HashMap::new()),
                latest: Mutex::new(None),
            }),
            task: Mutex::new(None),
        }
    }

    /// Register degradation callbacks under a component id.
    ///
    /// The component never hands the monitor a reference to itself; the
    /// hooks are dispatched from the monitor's own subscriptions to the
    /// throttle event types.
    pub fn register_throttleable_component(&self, id: impl Into<String>, hooks: ThrottleHooks) {
        let id = id.into();
        debug!(component = %id, "Throttleable component registered");
        self.inner.throttleable.lock().insert(id, hooks);
    }

    /// The most recent sample, if any tick has run.
    #[must_use]
    pub fn latest_sample(&self) -> Option<ResourceSample> {
        *self.inner.latest.lock()
    }

    /// Take one sample and run the policy table against it.
    ///
    /// Called by the interval task; exposed so tests can drive ticks
    /// deterministically.
    pub fn check_resources(&self) {
        self.inner.check_resources();
    }
}

impl MonitorInner {
    fn check_resources(&self) {
        let sample = self.probe.lock().sample();
        *self.latest.lock() = Some(sample);

        let thresholds = self.config.thresholds;

        if sample.cpu_percent >= thresholds.cpu_critical {
            error!(
                cpu = sample.cpu_percent,
                threshold = thresholds.cpu_critical,
                "Critical CPU usage"
            );
            self.bus.publish_from(
                event_types::RESOURCE_CPU_CRITICAL,
                EventPayload::ResourceAlert {
                    usage: sample.cpu_percent,
                    threshold: thresholds.cpu_critical,
                },
                EventPriority::Critical,
                SOURCE,
            );
            self.broadcast_throttle(event_types::RESOURCE_THROTTLE_AGGRESSIVE, sample);
        } else if sample.cpu_percent >= thresholds.cpu_warning {
            warn!(
                cpu = sample.cpu_percent,
                threshold = thresholds.cpu_warning,
                "CPU usage above warning threshold"
            );
            self.bus.publish_from(
                event_types::RESOURCE_CPU_WARNING,
                EventPayload::ResourceAlert {
                    usage: sample.cpu_percent,
                    threshold: thresholds.cpu_warning,
                },
                EventPriority::High,
                SOURCE,
            );
            self.broadcast_throttle(event_types::RESOURCE_THROTTLE_LIGHT, sample);
        }

        if sample.memory_mb >= thresholds.memory_critical_mb {
            error!(
                memory_mb = sample.memory_mb,
                threshold = thresholds.memory_critical_mb,
                "Critical memory usage"
            );
            self.bus.publish_from(
                event_types::RESOURCE_MEMORY_CRITICAL,
                EventPayload::ResourceAlert {
                    usage: sample.memory_mb as f64,
                    threshold: thresholds.memory_critical_mb as f64,
                },
                EventPriority::Critical,
                SOURCE,
            );
            // No collector to force in this runtime; reclamation rides the
            // cache-clear broadcast.
            self.bus.publish_from(
                event_types::RESOURCE_CLEAR_CACHES,
                EventPayload::CacheClear {
                    memory_mb: sample.memory_mb,
                },
                EventPriority::Critical,
                SOURCE,
            );
        } else if sample.memory_mb >= thresholds.memory_warning_mb {
            warn!(
                memory_mb = sample.memory_mb,
                threshold = thresholds.memory_warning_mb,
                "Memory usage above warning threshold"
            );
            self.bus.publish_from(
                event_types::RESOURCE_MEMORY_WARNING,
                EventPayload::ResourceAlert {
                    usage: sample.memory_mb as f64,
                    threshold: thresholds.memory_warning_mb as f64,
                },
                EventPriority::High,
                SOURCE,
            );
            debug!("Opportunistic reclamation requested");
        }

        self.bus.publish_from(
            event_types::RESOURCE_METRICS,
            EventPayload::ResourceMetrics {
                cpu_percent: sample.cpu_percent,
                memory_mb: sample.memory_mb,
                sampled_at_ms: sample.sampled_at_ms,
            },
            EventPriority::Normal,
            SOURCE,
        );
    }

    fn broadcast_throttle(&self, event_type: &str, sample: ResourceSample) {
        self.bus.publish_from(
            event_type,
            EventPayload::Throttle {
                cpu_percent: sample.cpu_percent,
                memory_mb: sample.memory_mb,
            },
            EventPriority::High,
            SOURCE,
        );
    }
}

#[async_trait]
impl Service for ResourceMonitor {
    async fn initialize(&self) -> Result<(), ServiceError> {
        info!("Initializing resource monitor");

        // Baseline snapshot; the first interval tick measures the delta
        // against this.
        let baseline = self.inner.probe.lock().sample();
        *self.inner.latest.lock() = Some(baseline);

        // Throttle broadcasts dispatch to registered hooks by id. The
        // subscriptions live for the process lifetime, like the bus itself.
        let inner = Arc::clone(&self.inner);
        self.inner
            .bus
            .subscribe(event_types::RESOURCE_THROTTLE_LIGHT, move |_| {
                for (id, hooks) in inner.throttleable.lock().iter() {
                    if let Some(light) = &hooks.light {
                        debug!(component = %id, "Applying light throttle");
                        light();
                    }
                }
                Ok(())
            });

        let inner = Arc::clone(&self.inner);
        self.inner
            .bus
            .subscribe(event_types::RESOURCE_THROTTLE_AGGRESSIVE, move |_| {
                for (id, hooks) in inner.throttleable.lock().iter() {
                    if let Some(aggressive) = &hooks.aggressive {
                        debug!(component = %id, "Applying aggressive throttle");
                        aggressive();
                    }
                }
                Ok(())
            });

        Ok(())
    }

    async fn start(&self) -> Result<(), ServiceError> {
        info!(
            interval_secs = self.inner.config.check_interval.as_secs(),
            "Starting resource monitor"
        );

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(inner.config.check_interval);
            // The immediate first tick re-reads the initialization baseline.
            interval.tick().await;
            loop {
                interval.tick().await;
                inner.check_resources();
            }
        });
        *self.task.lock() = Some(handle);

        Ok(())
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        info!("Stopping resource monitor");
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }
        Ok(())
    }
}
