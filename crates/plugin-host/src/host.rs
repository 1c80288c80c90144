//! # Plugin Host Service
//!
//! Directory discovery at initialize time, auto-enable at start, and the
//! enable/disable state machine. Every plugin failure is contained: the
//! offending plugin moves to `Error`, the call returns `false`, and the
//! host never re-raises.

use crate::api::{PluginApi, PluginFactory};
use crate::manifest::{PluginManifest, MANIFEST_FILE_NAME};
use crate::sandbox;
use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_bus::EventBus;
use shared_types::event::event_types;
use shared_types::{EventPayload, EventPriority, Service, ServiceError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Component name stamped on published events.
const SOURCE: &str = "plugin-host";

/// Plugin lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    /// Known but not yet loaded (transient during discovery).
    Unloaded,
    /// Manifest validated and recorded; no instance exists.
    Loaded,
    /// Instance created and initialized.
    Enabled,
    /// Instance shut down and dropped.
    Disabled,
    /// A lifecycle hook or factory failed.
    Error,
}

/// Host configuration supplied by the shell layer.
#[derive(Debug, Clone)]
pub struct PluginHostConfig {
    /// Directory scanned for plugin subdirectories.
    pub plugins_dir: PathBuf,
    /// Whether instantiation goes through the sandbox path.
    pub sandbox_enabled: bool,
}

impl Default for PluginHostConfig {
    fn default() -> Self {
        Self {
            plugins_dir: PathBuf::from("plugins"),
            sandbox_enabled: true,
        }
    }
}

struct PluginRecord {
    manifest: PluginManifest,
    dir: PathBuf,
    instance: Option<Box<dyn crate::api::Plugin>>,
    state: PluginState,
}

/// The plugin manager service.
pub struct PluginHost {
    bus: Arc<EventBus>,
    config: PluginHostConfig,
    plugins: Mutex<HashMap<String, PluginRecord>>,
    /// Discovery order, for deterministic auto-enable and shutdown.
    order: Mutex<Vec<String>>,
    factories: Mutex<HashMap<String, PluginFactory>>,
}

impl PluginHost {
    /// Create a host over the shared bus.
    #[must_use]
    pub fn new(bus: Arc<EventBus>, config: PluginHostConfig) -> Self {
        Self {
            bus,
            config,
            plugins: Mutex::new(HashMap::new()),
            order: Mutex::new(Vec::new()),
            factories: Mutex::new(HashMap::new()),
        }
    }

    /// Register the entry constructor for a plugin id.
    ///
    /// The shell registers one factory per plugin it ships; enabling a
    /// discovered plugin without a factory fails into the `Error` state.
    pub fn register_factory(&self, id: impl Into<String>, factory: PluginFactory) {
        self.factories.lock().insert(id.into(), factory);
    }

    /// Current state of a plugin, if known.
    #[must_use]
    pub fn plugin_state(&self, id: &str) -> Option<PluginState> {
        self.plugins.lock().get(id).map(|r| r.state)
    }

    /// Ids of all recorded plugins, in discovery order.
    #[must_use]
    pub fn plugin_ids(&self) -> Vec<String> {
        self.order.lock().clone()
    }

    fn discover_plugins(&self) -> std::io::Result<()> {
        let dir = &self.config.plugins_dir;
        info!(dir = %dir.display(), "Discovering plugins");

        let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(Result::ok)
            .filter(|e| e.path().is_dir())
            .map(|e| e.path())
            .collect();
        entries.sort();

        for plugin_dir in entries {
            self.load_plugin(&plugin_dir);
        }

        info!(count = self.order.lock().len(), "Plugin discovery complete");
        Ok(())
    }

    /// Validate and record a single plugin directory.
    ///
    /// Any failure skips this plugin and logs; discovery continues.
    fn load_plugin(&self, plugin_dir: &Path) {
        if !plugin_dir.join(MANIFEST_FILE_NAME).exists() {
            warn!(dir = %plugin_dir.display(), "No manifest.json, skipping");
            return;
        }

        let manifest = match PluginManifest::load(plugin_dir) {
            Ok(manifest) => manifest,
            Err(e) => {
                error!(dir = %plugin_dir.display(), error = %e, "Invalid plugin manifest, skipping");
                return;
            }
        };

        let id = manifest.id.clone();
        if self.plugins.lock().contains_key(&id) {
            warn!(plugin = %id, dir = %plugin_dir.display(), "Duplicate plugin id, skipping");
            return;
        }

        let main_path = plugin_dir.join(&manifest.main);
        if !main_path.exists() {
            error!(plugin = %id, main = %main_path.display(), "Entry file not found, skipping");
            return;
        }

        info!(plugin = %id, name = %manifest.name, version = %manifest.version, "Loaded plugin");

        let lifecycle = lifecycle_payload(&manifest);
        self.plugins.lock().insert(
            id.clone(),
            PluginRecord {
                manifest,
                dir: plugin_dir.to_path_buf(),
                instance: None,
                state: PluginState::Loaded,
            },
        );
        self.order.lock().push(id);

        self.bus.publish_from(
            event_types::PLUGIN_LOADED,
            lifecycle,
            EventPriority::Normal,
            SOURCE,
        );
    }

    /// Enable a plugin: instantiate its entry, run its `initialize` hook,
    /// and transition to `Enabled`.
    ///
    /// Returns `true` when the plugin ends up enabled (including the
    /// already-enabled no-op, which does not re-run `initialize`), `false`
    /// when the plugin is unknown, in a non-enableable state, or failed.
    pub fn enable_plugin(&self, id: &str) -> bool {
        {
            let plugins = self.plugins.lock();
            let Some(record) = plugins.get(id) else {
                warn!(plugin = %id, "Cannot enable unknown plugin");
                return false;
            };
            match record.state {
                PluginState::Enabled => {
                    debug!(plugin = %id, "Plugin already enabled");
                    return true;
                }
                PluginState::Loaded | PluginState::Disabled => {}
                state => {
                    warn!(plugin = %id, ?state, "Cannot enable plugin in this state");
                    return false;
                }
            }
        }

        // Instantiation and the plugin's own initialize hook run outside
        // the registry lock; plugin code may publish on the bus.
        let api = PluginApi::new(id, Arc::clone(&self.bus));
        let created = {
            let factories = self.factories.lock();
            match factories.get(id) {
                Some(factory) => sandbox::instantiate(factory, api, self.config.sandbox_enabled),
                None => Err(anyhow!("no factory registered for plugin `{id}`")),
            }
        };

        let mut instance = match created {
            Ok(instance) => instance,
            Err(e) => {
                error!(plugin = %id, error = %e, "Plugin instantiation failed");
                self.set_state(id, PluginState::Error);
                return false;
            }
        };

        if let Err(e) = instance.initialize() {
            error!(plugin = %id, error = %e, "Plugin initialize hook failed");
            self.set_state(id, PluginState::Error);
            return false;
        }

        let lifecycle = {
            let mut plugins = self.plugins.lock();
            let Some(record) = plugins.get_mut(id) else {
                return false;
            };
            record.instance = Some(instance);
            record.state = PluginState::Enabled;
            lifecycle_payload(&record.manifest)
        };

        info!(plugin = %id, "Plugin enabled");
        self.bus.publish_from(
            event_types::PLUGIN_ENABLED,
            lifecycle,
            EventPriority::Normal,
            SOURCE,
        );
        true
    }

    /// Disable a plugin: run its `shutdown` hook and drop the instance.
    ///
    /// Returns `true` when the plugin ends up disabled (including the
    /// not-enabled no-op), `false` when the plugin is unknown or its
    /// shutdown hook failed.
    pub fn disable_plugin(&self, id: &str) -> bool {
        let (instance, lifecycle) = {
            let mut plugins = self.plugins.lock();
            let Some(record) = plugins.get_mut(id) else {
                warn!(plugin = %id, "Cannot disable unknown plugin");
                return false;
            };
            if record.state != PluginState::Enabled {
                debug!(plugin = %id, "Plugin not enabled, nothing to disable");
                return true;
            }
            (record.instance.take(), lifecycle_payload(&record.manifest))
        };

        if let Some(mut instance) = instance {
            if let Err(e) = instance.shutdown() {
                error!(plugin = %id, error = %e, "Plugin shutdown hook failed");
                self.set_state(id, PluginState::Error);
                return false;
            }
        }

        self.set_state(id, PluginState::Disabled);
        info!(plugin = %id, "Plugin disabled");
        self.bus.publish_from(
            event_types::PLUGIN_DISABLED,
            lifecycle,
            EventPriority::Normal,
            SOURCE,
        );
        true
    }

    fn set_state(&self, id: &str, state: PluginState) {
        if let Some(record) = self.plugins.lock().get_mut(id) {
            record.state = state;
        }
    }

    /// Directory a plugin was discovered in.
    #[must_use]
    pub fn plugin_dir(&self, id: &str) -> Option<PathBuf> {
        self.plugins.lock().get(id).map(|r| r.dir.clone())
    }
}

fn lifecycle_payload(manifest: &PluginManifest) -> EventPayload {
    EventPayload::PluginLifecycle {
        id: manifest.id.clone(),
        name: manifest.name.clone(),
        version: manifest.version.clone(),
    }
}

#[async_trait]
impl Service for PluginHost {
    async fn initialize(&self) -> Result<(), ServiceError> {
        info!("Initializing plugin host");

        std::fs::create_dir_all(&self.config.plugins_dir)
            .map_err(|e| ServiceError::init(format!("cannot create plugins directory: {e}")))?;
        self.discover_plugins()
            .map_err(|e| ServiceError::init(format!("plugin discovery failed: {e}")))?;

        Ok(())
    }

    async fn start(&self) -> Result<(), ServiceError> {
        info!("Starting plugin host");

        let candidates: Vec<String> = {
            let plugins = self.plugins.lock();
            self.order
                .lock()
                .iter()
                .filter(|id| {
                    plugins.get(id.as_str()).is_some_and(|r| {
                        r.state == PluginState::Loaded && r.manifest.auto_enable
                    })
                })
                .cloned()
                .collect()
        };

        for id in candidates {
            // Contained failures; startup proceeds past broken plugins.
            self.enable_plugin(&id);
        }

        Ok(())
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        info!("Stopping plugin host");

        let enabled: Vec<String> = {
            let plugins = self.plugins.lock();
            self.order
                .lock()
                .iter()
                .filter(|id| {
                    plugins
                        .get(id.as_str())
                        .is_some_and(|r| r.state == PluginState::Enabled)
                })
                .cloned()
                .collect()
        };

        for id in enabled {
            self.disable_plugin(&id);
        }

        Ok(())
    }
}
