//! # Core Runtime
//!
//! The composition root of the desk companion backbone. The
//! [`ServiceOrchestrator`] owns service registration and the
//! dependency-ordered lifecycle; [`initialize_core`] wires the shared bus
//! and the three standard services together and brings them up.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (defaults overridden by `COMPANION_*` env vars)
//! 2. Create the shared event bus
//! 3. Register services with their dependency edges
//! 4. `initialize()` then `start()` in topological order
//! 5. Attach signal handlers and park

pub mod config;
pub mod orchestrator;
pub mod runtime;
pub mod signals;

pub use config::CoreConfig;
pub use orchestrator::{OrchestratorError, ServiceOrchestrator, ServiceState};
pub use runtime::{initialize_core, shutdown_core, service_names, CoreRuntime};
pub use signals::attach_signal_handlers;
