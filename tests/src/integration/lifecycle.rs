//! # Full Runtime Lifecycle
//!
//! Brings the whole core up through `initialize_core` and back down
//! through `shutdown_core`, checking orchestrator and per-service states
//! at each step.

#[cfg(test)]
mod tests {
    use core_runtime::runtime::service_names;
    use core_runtime::{
        initialize_core, shutdown_core, CoreConfig, OrchestratorError, ServiceState,
    };
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    fn test_config(plugins_dir: &Path) -> CoreConfig {
        let mut config = CoreConfig::default();
        // Ephemeral port so parallel tests never collide.
        config.gateway.port = 0;
        config.plugins.plugins_dir = plugins_dir.to_path_buf();
        // Keep sampling ticks out of lifecycle assertions.
        config.resources.check_interval = Duration::from_secs(3600);
        config
    }

    const ALL_SERVICES: [&str; 3] = [
        service_names::RESOURCE_MONITOR,
        service_names::REALTIME_GATEWAY,
        service_names::PLUGIN_HOST,
    ];

    #[tokio::test]
    async fn test_core_round_trip() {
        let plugins = TempDir::new().unwrap();
        let runtime = initialize_core(test_config(plugins.path())).await.unwrap();

        let orchestrator = runtime.orchestrator();
        assert!(orchestrator.is_running());
        for name in ALL_SERVICES {
            assert_eq!(
                orchestrator.service_state(name),
                Some(ServiceState::Running),
                "{name} should be running"
            );
        }
        assert!(runtime.gateway().local_addr().is_some());

        shutdown_core(&runtime).await;
        assert_eq!(orchestrator.state(), ServiceState::Stopped);
        for name in ALL_SERVICES {
            assert_eq!(
                orchestrator.service_state(name),
                Some(ServiceState::Stopped),
                "{name} should be stopped"
            );
        }
        assert!(runtime.gateway().local_addr().is_none());
    }

    #[tokio::test]
    async fn test_standard_services_start_in_dependency_order() {
        let plugins = TempDir::new().unwrap();
        let runtime = initialize_core(test_config(plugins.path())).await.unwrap();

        let order = runtime.orchestrator().ordered_services().unwrap();
        assert_eq!(
            order,
            vec![
                service_names::RESOURCE_MONITOR,
                service_names::REALTIME_GATEWAY,
                service_names::PLUGIN_HOST,
            ]
        );

        shutdown_core(&runtime).await;
    }

    #[tokio::test]
    async fn test_lifecycle_operations_are_single_shot() {
        let plugins = TempDir::new().unwrap();
        let runtime = initialize_core(test_config(plugins.path())).await.unwrap();
        let orchestrator = runtime.orchestrator();

        // The core is already past both phases; re-running either is an
        // invalid transition.
        assert!(matches!(
            orchestrator.initialize().await,
            Err(OrchestratorError::InvalidState { .. })
        ));
        assert!(matches!(
            orchestrator.start().await,
            Err(OrchestratorError::InvalidState { .. })
        ));

        shutdown_core(&runtime).await;

        // Stopping twice is also rejected; shutdown_core logs and swallows.
        assert!(matches!(
            orchestrator.stop().await,
            Err(OrchestratorError::InvalidState { .. })
        ));
        shutdown_core(&runtime).await;
        assert_eq!(orchestrator.state(), ServiceState::Stopped);
    }

    #[tokio::test]
    async fn test_plugin_enabled_against_running_core() {
        let plugins = TempDir::new().unwrap();
        let widget = plugins.path().join("status-widget");
        std::fs::create_dir_all(&widget).unwrap();
        std::fs::write(
            widget.join("manifest.json"),
            r#"{"id":"status-widget","name":"Status Widget","version":"1.0.0","autoEnable":false}"#,
        )
        .unwrap();
        std::fs::write(widget.join("plugin.wasm"), b"").unwrap();

        let runtime = initialize_core(test_config(plugins.path())).await.unwrap();
        let host = runtime.plugin_host();
        assert_eq!(
            host.plugin_state("status-widget"),
            Some(plugin_host::PluginState::Loaded)
        );

        host.register_factory("status-widget", Box::new(|_api| Ok(Box::new(NoopPlugin))));
        assert!(host.enable_plugin("status-widget"));
        assert_eq!(
            host.plugin_state("status-widget"),
            Some(plugin_host::PluginState::Enabled)
        );

        shutdown_core(&runtime).await;
        // Shutdown disables every enabled plugin.
        assert_eq!(
            host.plugin_state("status-widget"),
            Some(plugin_host::PluginState::Disabled)
        );
    }

    struct NoopPlugin;

    impl plugin_host::Plugin for NoopPlugin {}
}
