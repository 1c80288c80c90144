//! # Resource Monitor
//!
//! Samples CPU and memory on a fixed interval, publishes a
//! `resource.metrics` event every tick, and drives the threshold policy
//! table: warning/critical events per axis plus throttle and cache-clear
//! broadcasts to components that opted in.
//!
//! The monitor never holds a direct reference to the components it
//! throttles; throttleable components register callbacks by id and the
//! broadcasts travel over the shared bus like every other event.

pub mod monitor;
pub mod probe;

pub use monitor::{ResourceConfig, ResourceMonitor, Thresholds, ThrottleHooks};
pub use probe::{ResourceProbe, ResourceSample, SysinfoProbe};

/// Default sampling interval.
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 5;
