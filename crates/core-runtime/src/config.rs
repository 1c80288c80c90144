//! Runtime configuration.
//!
//! Defaults come from each service crate; `COMPANION_*` environment
//! variables override individual fields. Unparseable values are logged
//! and ignored rather than failing startup.

use plugin_host::PluginHostConfig;
use realtime_gateway::GatewayConfig;
use resource_monitor::ResourceConfig;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Configuration for the whole core runtime.
#[derive(Debug, Clone, Default)]
pub struct CoreConfig {
    pub gateway: GatewayConfig,
    pub plugins: PluginHostConfig,
    pub resources: ResourceConfig,
}

impl CoreConfig {
    /// Load defaults with environment overrides.
    ///
    /// Recognized variables:
    /// - `COMPANION_GATEWAY_PORT`
    /// - `COMPANION_TLS_ENABLED`
    /// - `COMPANION_AUTH_REQUIRED`
    /// - `COMPANION_PLUGINS_DIR`
    /// - `COMPANION_SANDBOX_ENABLED`
    /// - `COMPANION_CHECK_INTERVAL_SECS`
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Environment-shaped loading with an injectable variable source.
    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(port) = get("COMPANION_GATEWAY_PORT") {
            match port.parse() {
                Ok(port) => config.gateway.port = port,
                Err(_) => warn!(value = %port, "Ignoring invalid COMPANION_GATEWAY_PORT"),
            }
        }
        if let Some(flag) = get("COMPANION_TLS_ENABLED") {
            config.gateway.tls_enabled = parse_flag(&flag);
        }
        if let Some(flag) = get("COMPANION_AUTH_REQUIRED") {
            config.gateway.auth_required = parse_flag(&flag);
        }

        if let Some(dir) = get("COMPANION_PLUGINS_DIR") {
            config.plugins.plugins_dir = PathBuf::from(dir);
        }
        if let Some(flag) = get("COMPANION_SANDBOX_ENABLED") {
            config.plugins.sandbox_enabled = parse_flag(&flag);
        }

        if let Some(secs) = get("COMPANION_CHECK_INTERVAL_SECS") {
            match secs.parse() {
                Ok(secs) => config.resources.check_interval = Duration::from_secs(secs),
                Err(_) => {
                    warn!(value = %secs, "Ignoring invalid COMPANION_CHECK_INTERVAL_SECS");
                }
            }
        }

        config
    }
}

fn parse_flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(vars: &[(&str, &str)]) -> CoreConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        CoreConfig::from_vars(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_overrides() {
        let config = from_map(&[]);
        assert_eq!(config.gateway.port, realtime_gateway::DEFAULT_PORT);
        assert!(!config.gateway.auth_required);
        assert!(config.plugins.sandbox_enabled);
        assert_eq!(config.resources.check_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_env_overrides_applied() {
        let config = from_map(&[
            ("COMPANION_GATEWAY_PORT", "9090"),
            ("COMPANION_AUTH_REQUIRED", "true"),
            ("COMPANION_PLUGINS_DIR", "/tmp/widgets"),
            ("COMPANION_SANDBOX_ENABLED", "0"),
            ("COMPANION_CHECK_INTERVAL_SECS", "2"),
        ]);

        assert_eq!(config.gateway.port, 9090);
        assert!(config.gateway.auth_required);
        assert_eq!(config.plugins.plugins_dir, PathBuf::from("/tmp/widgets"));
        assert!(!config.plugins.sandbox_enabled);
        assert_eq!(config.resources.check_interval, Duration::from_secs(2));
    }

    #[test]
    fn test_invalid_values_fall_back_to_defaults() {
        let config = from_map(&[
            ("COMPANION_GATEWAY_PORT", "not-a-port"),
            ("COMPANION_CHECK_INTERVAL_SECS", "soon"),
        ]);
        assert_eq!(config.gateway.port, realtime_gateway::DEFAULT_PORT);
        assert_eq!(config.resources.check_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_flag_parsing_accepts_one_and_true() {
        assert!(parse_flag("1"));
        assert!(parse_flag("true"));
        assert!(parse_flag("TRUE"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("yes"));
    }
}
