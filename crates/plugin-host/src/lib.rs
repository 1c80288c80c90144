//! # Plugin Host
//!
//! Discovers plugins from a directory of manifests, validates them, and
//! supervises their lifecycle. Plugin failures never propagate: a plugin
//! that misbehaves lands in the `Error` state and the call that tripped it
//! returns `false`.
//!
//! Plugins see the runtime only through the [`PluginApi`] capability
//! object: bus subscriptions plus an `emit` that rewrites event types into
//! the plugin's own `plugin.<id>.*` namespace, so plugin events can never
//! collide with or spoof core event names.

pub mod api;
pub mod host;
pub mod manifest;
mod sandbox;

pub use api::{Plugin, PluginApi, PluginFactory};
pub use host::{PluginHost, PluginHostConfig, PluginState};
pub use manifest::{ManifestError, PluginManifest, MANIFEST_FILE_NAME};
