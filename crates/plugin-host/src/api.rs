//! # Plugin Capability Surface
//!
//! The [`PluginApi`] is a plugin's entire view of the runtime. It proxies
//! bus subscriptions and rewrites emitted event types into the plugin's
//! own namespace before publishing.

use shared_bus::{EventBus, SubscriptionId};
use shared_types::{Event, EventPayload, EventPriority};
use std::sync::Arc;
use uuid::Uuid;

/// A plugin instance hosted by the runtime.
///
/// Both hooks are optional; the defaults do nothing.
pub trait Plugin: Send {
    /// Called once right after instantiation.
    fn initialize(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called when the plugin is disabled.
    fn shutdown(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Constructor for a plugin's main entry, registered per plugin id.
///
/// Stands in for dynamically loading the manifest's entry module: the
/// shell registers a factory for every plugin it ships, and the host
/// invokes it with the capability object scoped to that plugin.
pub type PluginFactory = Box<dyn Fn(PluginApi) -> anyhow::Result<Box<dyn Plugin>> + Send + Sync>;

/// Capability object injected into a plugin at instantiation.
#[derive(Clone)]
pub struct PluginApi {
    plugin_id: String,
    bus: Arc<EventBus>,
}

impl PluginApi {
    pub(crate) fn new(plugin_id: impl Into<String>, bus: Arc<EventBus>) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            bus,
        }
    }

    /// The id of the plugin this capability object is scoped to.
    #[must_use]
    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    /// Subscribe to an event type on the shared bus.
    pub fn on<F>(&self, event_type: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.bus.subscribe(event_type, handler)
    }

    /// Remove a subscription created through [`PluginApi::on`].
    pub fn off(&self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Publish an event under the plugin's namespace.
    ///
    /// The type is rewritten to `plugin.<id>.<event_type>`, so plugins can
    /// never publish under a core event name.
    pub fn emit(&self, event_type: &str, data: serde_json::Value) -> Uuid {
        let namespaced = format!("plugin.{}.{}", self.plugin_id, event_type);
        self.bus.publish_from(
            &namespaced,
            EventPayload::Opaque(data),
            EventPriority::Normal,
            &self.plugin_id,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_emit_rewrites_into_plugin_namespace() {
        let bus = Arc::new(EventBus::new());
        let api = PluginApi::new("clock-widget", Arc::clone(&bus));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.subscribe("plugin.clock-widget.tick", move |event| {
            sink.lock().push(event.clone());
            Ok(())
        });

        api.emit("tick", serde_json::json!({ "count": 1 }));

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].event_type, "plugin.clock-widget.tick");
        assert_eq!(seen[0].source.as_deref(), Some("clock-widget"));
        assert!(matches!(seen[0].payload, EventPayload::Opaque(_)));
    }

    #[test]
    fn test_emit_cannot_spoof_core_event_names() {
        let bus = Arc::new(EventBus::new());
        let api = PluginApi::new("rogue", Arc::clone(&bus));

        let hits = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&hits);
        bus.subscribe("system.status", move |_| {
            *counter.lock() += 1;
            Ok(())
        });

        api.emit("system.status", serde_json::json!({}));
        assert_eq!(*hits.lock(), 0);
    }

    #[test]
    fn test_on_off_proxy_the_shared_bus() {
        let bus = Arc::new(EventBus::new());
        let api = PluginApi::new("clock-widget", Arc::clone(&bus));

        let id = api.on("system.status", |_| Ok(()));
        assert_eq!(bus.subscriber_count("system.status"), 1);
        assert!(api.off(id));
        assert_eq!(bus.subscriber_count("system.status"), 0);
    }
}
