//! # Shared Bus - Event Bus for Inter-Service Communication
//!
//! The single channel through which core services observe each other.
//!
//! ## Architecture Rules
//!
//! - All inter-service communication after startup goes through the bus;
//!   the orchestrator holds the only direct references to services.
//! - Exactly one bus instance exists per running system. It is explicitly
//!   constructed at composition time and passed by `Arc` (dependency
//!   injection), never looked up globally, so tests can build isolated
//!   instances.
//!
//! ## Dispatch Model
//!
//! Handlers run synchronously, in subscription-registration order, on the
//! task that calls `publish`. The subscriber list is snapshotted before
//! iteration, so handlers may subscribe or unsubscribe freely during
//! dispatch. Handler errors are caught and logged at the dispatch site
//! and never surface to the publisher.

pub mod bus;
pub mod history;

pub use bus::{EventBus, EventHandler, SubscriptionId};
pub use history::EventHistory;

/// Maximum events retained per persistent event type.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Wildcard marker that makes every event type persistent.
pub const PERSIST_ALL: &str = "*";
