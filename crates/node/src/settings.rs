//! Node configuration
//!
//! Layered as: built-in defaults, then an optional TOML file, then
//! environment variables such as `TELEMETRY_NODE__LINK__CONNECT_DELAY_MS`.

use crate::error::NodeError;
use ::config::{Config, Environment, File};
use acquisition::{AcquisitionConfig, AveragingConfig};
use link_sim::LinkConfig;
use sensor::MeasurementMode;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "telemetry-node.toml";

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "TELEMETRY_NODE";

/// Complete node configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub logging: LoggingConfig,
    pub store: StoreConfig,
    pub sensor: SensorConfig,
    pub acquisition: AcquisitionConfig,
    pub link: LinkConfig,
    pub bus: BusConfig,
    pub uplink: UplinkConfig,
    pub distance: DistanceConfig,
}

impl NodeConfig {
    /// Load configuration.
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, NodeError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Maximum level: trace, debug, info, warn or error
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Offline backlog
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Capacity in bytes (each sample takes 8)
    pub capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            capacity: ring_store::DEFAULT_CAPACITY,
        }
    }
}

/// Simulated temperature/humidity sensor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub seed: u64,
    pub mode: MeasurementMode,
    /// Corrupt every n-th frame; 0 disables fault injection
    pub fault_every: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            seed: 0x5348_5443,
            mode: MeasurementMode::Normal,
            fault_every: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Pending events per bus before posts start waiting
    pub queue_depth: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            queue_depth: event_bus::DEFAULT_QUEUE_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UplinkConfig {
    /// Restart the connect cycle whenever the link drops
    pub auto_reconnect: bool,
    /// Samples waiting for the uplink task
    pub queue_depth: usize,
}

impl Default for UplinkConfig {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            queue_depth: 32,
        }
    }
}

/// Optional averaging distance sampler
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceConfig {
    pub enabled: bool,
    pub seed: u64,
    pub averaging: AveragingConfig,
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            seed: 0x4750_3259,
            averaging: AveragingConfig::default(),
        }
    }
}
