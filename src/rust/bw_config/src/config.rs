//! Top-level configuration file for Bandwatch.

use crate::{EndpointEntry, MonitorConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use toml_edit::DocumentMut;
use tracing::{error, info};

/// Where the configuration lives unless overridden.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/bandwatch.conf";

/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
pub const CONFIG_ENV_VAR: &str = "BANDWATCH_CONFIG";

const CONFIG_VERSION: &str = "1.0";

/// Top-level configuration file for Bandwatch.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Version number for the configuration file. Currently "1.0".
    pub version: String,

    /// Capture and sampling settings
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Devices to watch from startup
    #[serde(default)]
    pub endpoints: Vec<EndpointEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            monitor: MonitorConfig::default(),
            endpoints: Vec::new(),
        }
    }
}

impl Config {
    /// The path that [`Config::load`] reads: `$BANDWATCH_CONFIG` if set,
    /// otherwise `/etc/bandwatch.conf`.
    pub fn config_path() -> PathBuf {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Load, parse and validate the configuration file.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(&Self::config_path())
    }

    /// Load, parse and validate a configuration file at a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            error!("{} does not exist!", path.display());
            return Err(ConfigError::ConfigDoesNotExist(path.display().to_string()));
        }
        let raw = std::fs::read_to_string(path).map_err(|e| {
            error!("Unable to read contents of {}: {e:?}", path.display());
            ConfigError::CannotReadFile(path.display().to_string())
        })?;
        info!("Loading configuration from {}", path.display());
        Self::load_from_string(&raw)
    }

    /// Parse and validate configuration text.
    pub fn load_from_string(raw: &str) -> Result<Self, ConfigError> {
        let document = raw.parse::<DocumentMut>().map_err(|e| {
            error!("Unable to parse TOML: {e:?}");
            ConfigError::CannotParseToml(e.to_string())
        })?;
        let config = toml_edit::de::from_document::<Config>(document).map_err(|e| {
            error!("Unable to deserialize configuration: {e:?}");
            ConfigError::CannotParseToml(e.to_string())
        })?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Test if a configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.version.trim() != CONFIG_VERSION {
            return Err(format!(
                "Configuration file is at version [{}], but this version of Bandwatch only supports version {CONFIG_VERSION}",
                self.version.trim()
            ));
        }
        self.monitor.validate()?;

        let mut seen = HashSet::new();
        for entry in self.endpoints.iter() {
            let address = entry.parse_address()?;
            entry.parse_hardware_address()?;
            if !seen.insert(address) {
                return Err(format!("Endpoint {address} is listed more than once"));
            }
        }
        Ok(())
    }
}

/// Things that can go wrong loading the configuration.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    /// No file at the configured path
    #[error("{0} not found. You must setup this file to use Bandwatch.")]
    ConfigDoesNotExist(String),
    /// The file exists but couldn't be read
    #[error("Unable to read contents of {0}.")]
    CannotReadFile(String),
    /// Not valid TOML, or doesn't match the schema
    #[error("Unable to parse configuration TOML: {0}")]
    CannotParseToml(String),
    /// Parsed, but the values don't make sense
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::PacketFilter;

    const EXAMPLE_CONF: &str = include_str!("../../../../bandwatch.example.conf");

    #[test]
    fn load_example() {
        let cfg = Config::load_from_string(EXAMPLE_CONF).unwrap();
        assert_eq!(cfg.monitor.sampling_interval_seconds, 5);
        assert_eq!(cfg.monitor.history_size, 60);
        assert_eq!(cfg.monitor.packet_filter, PacketFilter::AnyIp);
        assert_eq!(cfg.endpoints.len(), 2);
        assert_eq!(cfg.endpoints[0].name.as_deref(), Some("Living room AP"));
        assert!(cfg.endpoints[1].hardware_address.is_none());
    }

    #[test]
    fn minimal_config_takes_defaults() {
        let cfg = Config::load_from_string("version = \"1.0\"\n").unwrap();
        assert_eq!(cfg, Config::default());
        assert!(cfg.monitor.interface.is_none());
        assert_eq!(cfg.monitor.high_usage_threshold_mbps, 50.0);
    }

    #[test]
    fn rejects_bad_version() {
        let result = Config::load_from_string("version = \"0.9\"\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_bad_toml() {
        let result = Config::load_from_string("version = ");
        assert!(matches!(result, Err(ConfigError::CannotParseToml(_))));
    }

    #[test]
    fn rejects_bad_filter() {
        let raw = "version = \"1.0\"\n[monitor]\npacket_filter = \"tcp\"\n";
        assert!(matches!(
            Config::load_from_string(raw),
            Err(ConfigError::CannotParseToml(_))
        ));
    }

    #[test]
    fn rejects_zero_interval_and_history() {
        let raw = "version = \"1.0\"\n[monitor]\nsampling_interval_seconds = 0\n";
        assert!(matches!(Config::load_from_string(raw), Err(ConfigError::Invalid(_))));
        let raw = "version = \"1.0\"\n[monitor]\nhistory_size = 0\n";
        assert!(matches!(Config::load_from_string(raw), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_duplicate_and_invalid_endpoints() {
        let raw = r#"
version = "1.0"
[[endpoints]]
address = "10.0.0.1"
[[endpoints]]
address = "10.0.0.1"
"#;
        assert!(matches!(Config::load_from_string(raw), Err(ConfigError::Invalid(_))));

        let raw = r#"
version = "1.0"
[[endpoints]]
address = "router.local"
"#;
        assert!(matches!(Config::load_from_string(raw), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_file() {
        let result = Config::load_from_path(Path::new("/nonexistent/bandwatch.conf"));
        assert!(matches!(result, Err(ConfigError::ConfigDoesNotExist(_))));
    }
}
