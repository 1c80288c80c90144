//! # Event Model
//!
//! Defines the events that flow through the shared bus. Event types are
//! string keys (see [`event_types`]); payloads are a closed tagged union
//! with an opaque variant for plugin-namespaced events whose shape is not
//! known at compile time.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Well-known event type keys used by the core subsystems.
pub mod event_types {
    /// Unconditional per-tick resource sample.
    pub const RESOURCE_METRICS: &str = "resource.metrics";
    /// CPU crossed the warning threshold (below critical).
    pub const RESOURCE_CPU_WARNING: &str = "resource.cpu.warning";
    /// CPU crossed the critical threshold.
    pub const RESOURCE_CPU_CRITICAL: &str = "resource.cpu.critical";
    /// Memory crossed the warning threshold (below critical).
    pub const RESOURCE_MEMORY_WARNING: &str = "resource.memory.warning";
    /// Memory crossed the critical threshold.
    pub const RESOURCE_MEMORY_CRITICAL: &str = "resource.memory.critical";
    /// Light throttle broadcast to throttleable components.
    pub const RESOURCE_THROTTLE_LIGHT: &str = "resource.throttle.light";
    /// Aggressive throttle broadcast to throttleable components.
    pub const RESOURCE_THROTTLE_AGGRESSIVE: &str = "resource.throttle.aggressive";
    /// Cache-clear broadcast issued on critical memory pressure.
    pub const RESOURCE_CLEAR_CACHES: &str = "resource.memory.clear-caches";
    /// A plugin manifest was validated and recorded.
    pub const PLUGIN_LOADED: &str = "plugin.loaded";
    /// A plugin instance was created and initialized.
    pub const PLUGIN_ENABLED: &str = "plugin.enabled";
    /// A plugin instance was shut down.
    pub const PLUGIN_DISABLED: &str = "plugin.disabled";
    /// System status updates rebroadcast to every gateway client.
    pub const SYSTEM_STATUS: &str = "system.status";
    /// External command ingested by the gateway.
    pub const COMMAND: &str = "command";
}

/// Event priority levels.
///
/// Priority is informational metadata carried on the event. It does not
/// affect delivery order: the bus always dispatches in subscription
/// registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventPriority {
    /// Background noise; safe to ignore.
    Low,
    /// Default priority.
    Normal,
    /// Important operational event.
    High,
    /// Requires attention (resource criticals, fatal lifecycle errors).
    Critical,
}

impl Default for EventPriority {
    fn default() -> Self {
        Self::Normal
    }
}

/// Typed payloads for the known internal event kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPayload {
    /// Current resource sample, published every monitoring tick.
    ResourceMetrics {
        /// CPU usage normalized to a single-core percentage.
        cpu_percent: f64,
        /// Resident memory of the process in megabytes.
        memory_mb: u64,
        /// When the sample was taken (unix millis).
        sampled_at_ms: u64,
    },
    /// A resource reading crossed a threshold.
    ResourceAlert {
        /// The measured value (percent or MB depending on the event type).
        usage: f64,
        /// The threshold that was crossed.
        threshold: f64,
    },
    /// Throttle broadcast carrying the sample that triggered it.
    Throttle {
        /// CPU usage at trigger time.
        cpu_percent: f64,
        /// Memory usage at trigger time.
        memory_mb: u64,
    },
    /// Cache-clear broadcast issued under critical memory pressure.
    CacheClear {
        /// Memory usage at trigger time.
        memory_mb: u64,
    },
    /// Plugin lifecycle notification (`plugin.loaded` / `enabled` / `disabled`).
    PluginLifecycle {
        /// Plugin id (slug).
        id: String,
        /// Human-readable plugin name.
        name: String,
        /// Manifest version.
        version: String,
    },
    /// External command ingested by the realtime gateway.
    Command {
        /// Command name.
        command: String,
        /// Command parameters as supplied by the client.
        params: serde_json::Value,
        /// Gateway client that issued the command.
        client_id: String,
        /// When the command was received (unix millis).
        timestamp_ms: u64,
    },
    /// Escape hatch for plugin-namespaced events of unknown shape.
    Opaque(serde_json::Value),
    /// Events that carry no data.
    Empty,
}

/// An event published on the shared bus.
///
/// Immutable once published; subscribers receive a shared reference and
/// the history ring stores clones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event id.
    pub id: Uuid,
    /// The string key subscribers register against.
    pub event_type: String,
    /// Typed payload.
    pub payload: EventPayload,
    /// Informational priority.
    pub priority: EventPriority,
    /// Publish time (unix millis).
    pub timestamp_ms: u64,
    /// Optional originating component.
    pub source: Option<String>,
}

impl Event {
    /// Build a new event stamped with a fresh id and the current time.
    #[must_use]
    pub fn new(event_type: impl Into<String>, payload: EventPayload, priority: EventPriority) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type: event_type.into(),
            payload,
            priority,
            timestamp_ms: now_millis(),
            source: None,
        }
    }

    /// Attach the originating component name.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Current unix time in milliseconds.
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
