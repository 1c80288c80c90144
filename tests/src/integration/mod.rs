//! Cross-service integration flows.

pub mod lifecycle;
pub mod monitoring;
pub mod plugin_flows;
