//! Sandboxed plugin instantiation.
//!
//! Full process/VM isolation is an extension point; today the sandbox
//! flag only selects this path, which instantiates in-process like the
//! direct path.

use crate::api::{Plugin, PluginApi, PluginFactory};
use tracing::debug;

pub(crate) fn instantiate(
    factory: &PluginFactory,
    api: PluginApi,
    sandboxed: bool,
) -> anyhow::Result<Box<dyn Plugin>> {
    if sandboxed {
        debug!(plugin = %api.plugin_id(), "Instantiating through sandbox path");
    }
    factory(api)
}
