//! # Resource Probes
//!
//! OS-level sampling behind a trait so the policy logic is testable with
//! a scripted probe.

use shared_types::now_millis;
use sysinfo::{get_current_pid, Pid, ProcessesToUpdate, System};
use tracing::warn;

/// One resource measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceSample {
    /// CPU usage normalized to a single-core percentage.
    pub cpu_percent: f64,
    /// Resident memory of this process in megabytes.
    pub memory_mb: u64,
    /// When the sample was taken (unix millis).
    pub sampled_at_ms: u64,
}

/// Source of resource samples.
///
/// `sample` is called once at initialization to establish the baseline
/// snapshot and then once per monitoring tick.
pub trait ResourceProbe: Send {
    /// Take a measurement relative to the previous call.
    fn sample(&mut self) -> ResourceSample;
}

/// Probe backed by the `sysinfo` crate.
///
/// The retained [`System`] holds the previous CPU-time snapshot; each
/// refresh computes usage from the delta since the last one, so the first
/// reading after construction is the baseline and reads as idle.
pub struct SysinfoProbe {
    system: System,
    pid: Option<Pid>,
}

impl SysinfoProbe {
    /// Create a probe and take the baseline snapshot.
    #[must_use]
    pub fn new() -> Self {
        let mut system = System::new_all();
        system.refresh_all();
        let pid = match get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                warn!(error = %e, "Cannot resolve current pid; memory readings disabled");
                None
            }
        };
        Self { system, pid }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceProbe for SysinfoProbe {
    fn sample(&mut self) -> ResourceSample {
        self.system.refresh_cpu_all();
        if let Some(pid) = self.pid {
            self.system
                .refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        }

        // global_cpu_usage is the machine-wide busy percentage (0-100
        // regardless of core count); the policy thresholds expect it
        // scaled down to a single core's share.
        let cpu_percent = single_core_percent(
            f64::from(self.system.global_cpu_usage()),
            self.system.cpus().len(),
        );
        let memory_mb = self
            .pid
            .and_then(|pid| self.system.process(pid))
            .map_or(0, |process| process.memory() / (1024 * 1024));

        ResourceSample {
            cpu_percent,
            memory_mb,
            sampled_at_ms: now_millis(),
        }
    }
}

/// Scale a machine-wide busy percentage down to one core's share.
fn single_core_percent(machine_percent: f64, cores: usize) -> f64 {
    machine_percent / cores.max(1) as f64
}
