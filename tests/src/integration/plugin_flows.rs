//! # Plugin Runtime Flows
//!
//! Plugins talking to the rest of the runtime through their capability
//! object: receiving gateway commands off the bus and emitting events
//! under their own namespace.

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use plugin_host::{Plugin, PluginApi, PluginHost, PluginHostConfig};
    use realtime_gateway::{GatewayConfig, RealtimeGateway};
    use shared_bus::{EventBus, SubscriptionId};
    use shared_types::event::event_types;
    use shared_types::{Event, EventPayload, Service};
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn write_plugin(root: &Path, id: &str) {
        let dir = root.join(id);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("manifest.json"),
            format!(r#"{{"id":"{id}","name":"{id}","version":"1.0.0","autoEnable":false}}"#),
        )
        .unwrap();
        std::fs::write(dir.join("plugin.wasm"), b"").unwrap();
    }

    fn host_for(root: &TempDir, bus: &Arc<EventBus>) -> PluginHost {
        PluginHost::new(
            Arc::clone(bus),
            PluginHostConfig {
                plugins_dir: root.path().to_path_buf(),
                sandbox_enabled: true,
            },
        )
    }

    /// Records every `command` event it sees while enabled, and cleans up
    /// its subscription on shutdown.
    struct CommandRecorder {
        api: PluginApi,
        seen: Arc<Mutex<Vec<String>>>,
        subscription: Option<SubscriptionId>,
    }

    impl Plugin for CommandRecorder {
        fn initialize(&mut self) -> anyhow::Result<()> {
            let seen = Arc::clone(&self.seen);
            let id = self.api.on(event_types::COMMAND, move |event| {
                if let EventPayload::Command { command, .. } = &event.payload {
                    seen.lock().push(command.clone());
                }
                Ok(())
            });
            self.subscription = Some(id);
            Ok(())
        }

        fn shutdown(&mut self) -> anyhow::Result<()> {
            if let Some(id) = self.subscription.take() {
                self.api.off(id);
            }
            Ok(())
        }
    }

    /// Emits one namespaced event when it comes up.
    struct Ticker {
        api: PluginApi,
    }

    impl Plugin for Ticker {
        fn initialize(&mut self) -> anyhow::Result<()> {
            self.api.emit("tick", serde_json::json!({ "count": 1 }));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_gateway_command_reaches_enabled_plugin() {
        let root = TempDir::new().unwrap();
        write_plugin(root.path(), "command-log");

        let bus = Arc::new(EventBus::new());
        let host = host_for(&root, &bus);
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = Arc::clone(&seen);
            host.register_factory(
                "command-log",
                Box::new(move |api| {
                    Ok(Box::new(CommandRecorder {
                        api,
                        seen: Arc::clone(&seen),
                        subscription: None,
                    }) as Box<dyn Plugin>)
                }),
            );
        }
        host.initialize().await.unwrap();
        assert!(host.enable_plugin("command-log"));

        let gateway = RealtimeGateway::new(Arc::clone(&bus), GatewayConfig::default());
        let (client_id, mut rx) = gateway.open_session();
        let _welcome = rx.try_recv().unwrap();

        gateway.handle_frame(&client_id, r#"{"type":"command","command":"refresh"}"#);
        assert_eq!(*seen.lock(), vec!["refresh"]);

        // Receipt still goes back to the client.
        let receipt: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(receipt["type"], "command");
        assert_eq!(receipt["received"], true);

        // After disable, the plugin's subscription is gone.
        assert!(host.disable_plugin("command-log"));
        gateway.handle_frame(&client_id, r#"{"type":"command","command":"again"}"#);
        assert_eq!(*seen.lock(), vec!["refresh"]);
    }

    #[tokio::test]
    async fn test_plugin_events_are_namespaced() {
        let root = TempDir::new().unwrap();
        write_plugin(root.path(), "ticker");

        let bus = Arc::new(EventBus::new());
        let host = host_for(&root, &bus);
        host.register_factory(
            "ticker",
            Box::new(|api| Ok(Box::new(Ticker { api }) as Box<dyn Plugin>)),
        );

        let namespaced: Arc<Mutex<Vec<Event>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&namespaced);
        bus.subscribe("plugin.ticker.tick", move |event| {
            sink.lock().push(event.clone());
            Ok(())
        });
        let bare_hits = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&bare_hits);
        bus.subscribe("tick", move |_| {
            *counter.lock() += 1;
            Ok(())
        });

        host.initialize().await.unwrap();
        assert!(host.enable_plugin("ticker"));

        let namespaced = namespaced.lock();
        assert_eq!(namespaced.len(), 1);
        assert_eq!(namespaced[0].event_type, "plugin.ticker.tick");
        assert_eq!(namespaced[0].source.as_deref(), Some("ticker"));
        // The bare event name never fires; plugins cannot escape their
        // namespace.
        assert_eq!(*bare_hits.lock(), 0);
    }
}
