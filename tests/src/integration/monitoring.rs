//! # Resource Monitoring Flows
//!
//! Drives the resource monitor's policy table with scripted samples and
//! checks what lands on the bus, on registered throttle hooks, and on
//! gateway clients subscribed to the metrics topic.

#[cfg(test)]
mod tests {
    use realtime_gateway::{GatewayConfig, RealtimeGateway};
    use resource_monitor::{
        ResourceConfig, ResourceMonitor, ResourceProbe, ResourceSample, ThrottleHooks,
    };
    use shared_bus::EventBus;
    use shared_types::event::event_types;
    use shared_types::{now_millis, Service};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct ScriptedProbe {
        samples: VecDeque<(f64, u64)>,
    }

    impl ScriptedProbe {
        fn new(samples: &[(f64, u64)]) -> Box<Self> {
            Box::new(Self {
                samples: samples.iter().copied().collect(),
            })
        }
    }

    impl ResourceProbe for ScriptedProbe {
        fn sample(&mut self) -> ResourceSample {
            let (cpu_percent, memory_mb) = self.samples.pop_front().unwrap_or((0.0, 0));
            ResourceSample {
                cpu_percent,
                memory_mb,
                sampled_at_ms: now_millis(),
            }
        }
    }

    fn counter_hook(counter: &Arc<AtomicUsize>) -> Option<Box<dyn Fn() + Send + Sync>> {
        let counter = Arc::clone(counter);
        Some(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[tokio::test]
    async fn test_metrics_fan_out_to_subscribed_gateway_clients() {
        let bus = Arc::new(EventBus::new());
        let gateway = RealtimeGateway::new(Arc::clone(&bus), GatewayConfig::default());
        gateway.initialize().await.unwrap();

        let (client_id, mut rx) = gateway.open_session();
        let _welcome = rx.try_recv().unwrap();
        gateway.handle_frame(
            &client_id,
            r#"{"type":"subscribe","topic":"resource.metrics"}"#,
        );
        let _ack = rx.try_recv().unwrap();

        let monitor = ResourceMonitor::with_probe(
            Arc::clone(&bus),
            ResourceConfig::default(),
            ScriptedProbe::new(&[(0.25, 12)]),
        );
        monitor.check_resources();

        let frame: serde_json::Value =
            serde_json::from_str(&rx.try_recv().expect("metrics frame")).unwrap();
        assert_eq!(frame["type"], "event");
        assert_eq!(frame["topic"], "resource.metrics");
        assert_eq!(frame["data"]["cpu_percent"], 0.25);
        assert_eq!(frame["data"]["memory_mb"], 12);
    }

    #[tokio::test]
    async fn test_throttle_hooks_escalate_with_cpu_pressure() {
        let bus = Arc::new(EventBus::new());
        let monitor = ResourceMonitor::with_probe(
            Arc::clone(&bus),
            ResourceConfig::default(),
            // Baseline consumed by initialize, then a warning tick and a
            // critical tick.
            ScriptedProbe::new(&[(0.0, 0), (0.9, 10), (1.2, 10)]),
        );
        monitor.initialize().await.unwrap();

        let light = Arc::new(AtomicUsize::new(0));
        let aggressive = Arc::new(AtomicUsize::new(0));
        monitor.register_throttleable_component(
            "animation-engine",
            ThrottleHooks {
                light: counter_hook(&light),
                aggressive: counter_hook(&aggressive),
            },
        );
        monitor.register_throttleable_component(
            "thumbnail-cache",
            ThrottleHooks {
                light: counter_hook(&light),
                aggressive: None,
            },
        );

        // Warning tick: every light hook fires, no aggressive ones.
        monitor.check_resources();
        assert_eq!(light.load(Ordering::SeqCst), 2);
        assert_eq!(aggressive.load(Ordering::SeqCst), 0);

        // Critical tick: aggressive only.
        monitor.check_resources();
        assert_eq!(light.load(Ordering::SeqCst), 2);
        assert_eq!(aggressive.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_memory_critical_requests_cache_clear() {
        let bus = Arc::new(EventBus::new());
        let cache_clears = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&cache_clears);
        bus.subscribe(event_types::RESOURCE_CLEAR_CACHES, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let monitor = ResourceMonitor::with_probe(
            Arc::clone(&bus),
            ResourceConfig::default(),
            // Warning-level memory first, then critical.
            ScriptedProbe::new(&[(0.0, 40), (0.0, 50)]),
        );

        monitor.check_resources();
        assert_eq!(cache_clears.load(Ordering::SeqCst), 0);

        monitor.check_resources();
        assert_eq!(cache_clears.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_interval_task_publishes_metrics_until_stopped() {
        let bus = Arc::new(EventBus::new());
        let metrics = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&metrics);
        bus.subscribe(event_types::RESOURCE_METRICS, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let config = ResourceConfig {
            check_interval: Duration::from_millis(10),
            ..ResourceConfig::default()
        };
        let monitor =
            ResourceMonitor::with_probe(Arc::clone(&bus), config, ScriptedProbe::new(&[]));
        monitor.initialize().await.unwrap();
        monitor.start().await.unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;
        monitor.stop().await.unwrap();
        let observed = metrics.load(Ordering::SeqCst);
        assert!(observed >= 1, "expected at least one tick, saw {observed}");
        assert!(monitor.latest_sample().is_some());

        // No more ticks after stop.
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(metrics.load(Ordering::SeqCst), observed);
    }
}
