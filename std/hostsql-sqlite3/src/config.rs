///
/// # Registry Configuration
///
/// Settings for table sizing, reset behavior and how connections are opened,
/// read from a TOML file. Every field has a default, so an empty file (or no
/// file at all) yields the stock configuration.
///
/// ## Example hostsql.toml
///
/// ```toml
/// [registry]
/// initial_connections = 16
/// initial_statements = 8
/// reset_policy = "retain"
///
/// [open]
/// read_only = false
/// create = true
/// uri = false
/// busy_timeout_ms = 0
/// ```
///
/// Both initial capacities must lie between 1 and 65536; the tables grow
/// past that on demand.
///
/// ## Reset policy
///
/// `retain` keeps the statement handle after a reset so it can be rebound
/// and stepped again. `release` frees the handle (and finalizes the
/// statement) after every reset, for hosts written against that behavior.
///

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Largest accepted `initial_connections` / `initial_statements`
pub const MAX_INITIAL_CAPACITY: usize = 1 << 16;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub registry: RegistryConfig,
    pub open: OpenConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub initial_connections: usize,
    pub initial_statements: usize,
    pub reset_policy: ResetPolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            initial_connections: 16,
            initial_statements: 8,
            reset_policy: ResetPolicy::Retain,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetPolicy {
    #[default]
    Retain,
    Release,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OpenConfig {
    pub read_only: bool,
    pub create: bool,
    pub uri: bool,
    pub busy_timeout_ms: u32,
}

impl Default for OpenConfig {
    fn default() -> Self {
        Self {
            read_only: false,
            create: true,
            uri: false,
            busy_timeout_ms: 0,
        }
    }
}

impl Config {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_capacity("initial_connections", self.registry.initial_connections)?;
        check_capacity("initial_statements", self.registry.initial_statements)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn check_capacity(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if (1..=MAX_INITIAL_CAPACITY).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Capacity {
            field,
            value,
            max: MAX_INITIAL_CAPACITY,
        })
    }
}
