//! # Service Lifecycle Contract
//!
//! Defines the trait every orchestrated service implements. All three
//! hooks default to no-ops, so a service participates only in the phases
//! it cares about; the orchestrator calls whatever is there without
//! probing for method presence.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Categories of service lifecycle errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    /// The `initialize` hook failed.
    InitializationFailed,
    /// The `start` hook failed.
    StartFailed,
    /// The `stop` hook failed.
    ShutdownFailed,
    /// Invalid or missing configuration.
    ConfigurationError,
}

impl fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitializationFailed => write!(f, "InitializationFailed"),
            Self::StartFailed => write!(f, "StartFailed"),
            Self::ShutdownFailed => write!(f, "ShutdownFailed"),
            Self::ConfigurationError => write!(f, "ConfigurationError"),
        }
    }
}

/// Error returned by a service lifecycle hook.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct ServiceError {
    /// Error category.
    pub kind: ServiceErrorKind,
    /// Human-readable description.
    pub message: String,
}

impl ServiceError {
    /// Build an error with the given category.
    #[must_use]
    pub fn new(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for an initialization failure.
    #[must_use]
    pub fn init(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::InitializationFailed, message)
    }

    /// Shorthand for a start failure.
    #[must_use]
    pub fn start(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::StartFailed, message)
    }

    /// Shorthand for a shutdown failure.
    #[must_use]
    pub fn shutdown(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::ShutdownFailed, message)
    }
}

/// Contract for services managed by the orchestrator.
///
/// Hooks take `&self`; services keep their mutable state behind interior
/// locks so a single `Arc<dyn Service>` can be shared between the
/// orchestrator and the composition root.
#[async_trait]
pub trait Service: Send + Sync {
    /// One-time setup before any service starts.
    async fn initialize(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    /// Begin active work. Called after every registered service initialized.
    async fn start(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    /// Stop active work and release resources.
    async fn stop(&self) -> Result<(), ServiceError> {
        Ok(())
    }
}
