//! # Service Orchestrator
//!
//! Registry of named services with explicit dependency edges. Lifecycle
//! phases run in depth-first topological order: dependencies initialize
//! and start before their dependents, and shutdown walks the same order
//! in reverse.
//!
//! Failure policy differs by phase. An `initialize` or `start` failure is
//! fatal: the failing service and the orchestrator land in `Error` and
//! the sequence aborts. A `stop` failure is recorded per service and
//! swallowed so every service gets its shutdown attempt.

use parking_lot::Mutex;
use shared_types::{Service, ServiceError};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// Lifecycle state of a service, and of the orchestrator itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Uninitialized,
    Initializing,
    Initialized,
    Starting,
    Running,
    Stopping,
    Stopped,
    Error,
}

/// Errors surfaced by the orchestrator.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A service with this name is already registered.
    #[error("service `{0}` is already registered")]
    DuplicateService(String),

    /// A registered service names a dependency nobody registered.
    #[error("service `{service}` depends on unknown service `{dependency}`")]
    UnknownDependency { service: String, dependency: String },

    /// The requested lifecycle operation is not legal from the current
    /// orchestrator state.
    #[error("cannot {operation} from state {state:?}")]
    InvalidState {
        operation: &'static str,
        state: ServiceState,
    },

    /// A service hook failed during initialize or start.
    #[error("service `{service}` failed during {phase}: {source}")]
    Lifecycle {
        service: String,
        phase: &'static str,
        #[source]
        source: ServiceError,
    },
}

struct ServiceEntry {
    service: Arc<dyn Service>,
    dependencies: Vec<String>,
    state: ServiceState,
}

/// Owns every registered service and drives their lifecycle.
pub struct ServiceOrchestrator {
    services: Mutex<HashMap<String, ServiceEntry>>,
    /// Registration order, the deterministic base for the topological walk.
    order: Mutex<Vec<String>>,
    /// Topological order captured by `initialize`; `start` and `stop`
    /// reuse it so late registrations never change a running sequence.
    resolved: Mutex<Vec<String>>,
    state: Mutex<ServiceState>,
}

impl Default for ServiceOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceOrchestrator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            services: Mutex::new(HashMap::new()),
            order: Mutex::new(Vec::new()),
            resolved: Mutex::new(Vec::new()),
            state: Mutex::new(ServiceState::Uninitialized),
        }
    }

    /// Register a service under a unique name with its dependency names.
    ///
    /// Dependencies are stored verbatim and validated only when an order
    /// is computed, so registration order does not matter.
    pub fn register_service(
        &self,
        name: impl Into<String>,
        service: Arc<dyn Service>,
        dependencies: &[&str],
    ) -> Result<(), OrchestratorError> {
        let name = name.into();
        let mut services = self.services.lock();
        if services.contains_key(&name) {
            return Err(OrchestratorError::DuplicateService(name));
        }

        info!(service = %name, ?dependencies, "Registered service");
        services.insert(
            name.clone(),
            ServiceEntry {
                service,
                dependencies: dependencies.iter().map(|d| (*d).to_string()).collect(),
                state: ServiceState::Uninitialized,
            },
        );
        self.order.lock().push(name);
        Ok(())
    }

    /// Compute the depth-first topological order: dependencies first,
    /// every service exactly once, ties broken by registration order.
    pub fn ordered_services(&self) -> Result<Vec<String>, OrchestratorError> {
        fn visit(
            name: &str,
            services: &HashMap<String, ServiceEntry>,
            visited: &mut HashSet<String>,
            sorted: &mut Vec<String>,
        ) -> Result<(), OrchestratorError> {
            if !visited.insert(name.to_string()) {
                return Ok(());
            }
            if let Some(entry) = services.get(name) {
                for dependency in &entry.dependencies {
                    if !services.contains_key(dependency) {
                        return Err(OrchestratorError::UnknownDependency {
                            service: name.to_string(),
                            dependency: dependency.clone(),
                        });
                    }
                    visit(dependency, services, visited, sorted)?;
                }
            }
            sorted.push(name.to_string());
            Ok(())
        }

        let services = self.services.lock();
        let order = self.order.lock();
        let mut visited = HashSet::new();
        let mut sorted = Vec::with_capacity(order.len());
        for name in order.iter() {
            visit(name, &services, &mut visited, &mut sorted)?;
        }
        Ok(sorted)
    }

    /// Initialize every service in dependency order.
    ///
    /// Legal only from `Uninitialized`. The topological order is computed
    /// once here and reused by `start` and `stop`. The first failure
    /// aborts the sequence; already initialized services keep their state.
    pub async fn initialize(&self) -> Result<(), OrchestratorError> {
        self.transition(
            "initialize",
            ServiceState::Uninitialized,
            ServiceState::Initializing,
        )?;
        info!("Initializing services");

        let order = match self.ordered_services() {
            Ok(order) => order,
            Err(e) => {
                *self.state.lock() = ServiceState::Error;
                return Err(e);
            }
        };
        *self.resolved.lock() = order.clone();

        for name in order {
            let Some(service) = self.begin_phase(&name, ServiceState::Initializing) else {
                continue;
            };
            info!(service = %name, "Initializing service");

            if let Err(e) = service.initialize().await {
                error!(service = %name, error = %e, "Service initialization failed");
                self.set_service_state(&name, ServiceState::Error);
                *self.state.lock() = ServiceState::Error;
                return Err(OrchestratorError::Lifecycle {
                    service: name,
                    phase: "initialize",
                    source: e,
                });
            }
            self.set_service_state(&name, ServiceState::Initialized);
        }

        *self.state.lock() = ServiceState::Initialized;
        info!("All services initialized");
        Ok(())
    }

    /// Start every service in dependency order.
    ///
    /// Legal only from `Initialized`; same abort-on-failure policy as
    /// [`ServiceOrchestrator::initialize`].
    pub async fn start(&self) -> Result<(), OrchestratorError> {
        self.transition("start", ServiceState::Initialized, ServiceState::Starting)?;
        info!("Starting services");

        let order = self.resolved.lock().clone();

        for name in order {
            let Some(service) = self.begin_phase(&name, ServiceState::Starting) else {
                continue;
            };
            info!(service = %name, "Starting service");

            if let Err(e) = service.start().await {
                error!(service = %name, error = %e, "Service failed to start");
                self.set_service_state(&name, ServiceState::Error);
                *self.state.lock() = ServiceState::Error;
                return Err(OrchestratorError::Lifecycle {
                    service: name,
                    phase: "start",
                    source: e,
                });
            }
            self.set_service_state(&name, ServiceState::Running);
        }

        *self.state.lock() = ServiceState::Running;
        info!("All services running");
        Ok(())
    }

    /// Stop every service in the reverse of the order captured at
    /// initialize.
    ///
    /// Legal only from `Running`. Individual stop failures are logged and
    /// swallowed; every service gets exactly one shutdown attempt and the
    /// orchestrator always lands in `Stopped`.
    pub async fn stop(&self) -> Result<(), OrchestratorError> {
        self.transition("stop", ServiceState::Running, ServiceState::Stopping)?;
        info!("Stopping services");

        let order = self.resolved.lock().clone();

        for name in order.into_iter().rev() {
            let Some(service) = self.begin_phase(&name, ServiceState::Stopping) else {
                continue;
            };
            info!(service = %name, "Stopping service");

            match service.stop().await {
                Ok(()) => self.set_service_state(&name, ServiceState::Stopped),
                Err(e) => {
                    error!(service = %name, error = %e, "Service failed to stop cleanly");
                    self.set_service_state(&name, ServiceState::Error);
                }
            }
        }

        *self.state.lock() = ServiceState::Stopped;
        info!("All services stopped");
        Ok(())
    }

    /// Current orchestrator state.
    #[must_use]
    pub fn state(&self) -> ServiceState {
        *self.state.lock()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == ServiceState::Running
    }

    /// Current state of a registered service.
    #[must_use]
    pub fn service_state(&self, name: &str) -> Option<ServiceState> {
        self.services.lock().get(name).map(|e| e.state)
    }

    /// Names of all registered services, in registration order.
    #[must_use]
    pub fn service_names(&self) -> Vec<String> {
        self.order.lock().clone()
    }

    fn transition(
        &self,
        operation: &'static str,
        expected: ServiceState,
        next: ServiceState,
    ) -> Result<(), OrchestratorError> {
        let mut state = self.state.lock();
        if *state != expected {
            return Err(OrchestratorError::InvalidState {
                operation,
                state: *state,
            });
        }
        *state = next;
        Ok(())
    }

    /// Mark a service as entering a phase and hand back its handle. The
    /// lock is released before the hook runs.
    fn begin_phase(&self, name: &str, state: ServiceState) -> Option<Arc<dyn Service>> {
        let mut services = self.services.lock();
        let entry = services.get_mut(name)?;
        entry.state = state;
        Some(Arc::clone(&entry.service))
    }

    fn set_service_state(&self, name: &str, state: ServiceState) {
        if let Some(entry) = self.services.lock().get_mut(name) {
            entry.state = state;
        }
    }
}
