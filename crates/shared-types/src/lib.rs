//! # Shared Types Crate
//!
//! Cross-cutting types for the Desk Companion core runtime.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: the event model and the service lifecycle
//!   contract live here so subsystem crates never depend on each other.
//! - **Event-only communication**: after startup, subsystems observe each
//!   other exclusively through [`Event`]s published on the shared bus.
//! - **Closed payload union**: internal events carry a typed payload from
//!   [`EventPayload`]; only plugin-namespaced events use the opaque escape
//!   hatch.

pub mod event;
pub mod service;

pub use event::{now_millis, Event, EventPayload, EventPriority};
pub use service::{Service, ServiceError, ServiceErrorKind};
