//! Telemetry Node
//!
//! Assembles the connectivity-aware buffering pipeline: a simulated uplink,
//! periodic acquisition with an offline backlog, and an optional averaging
//! distance sampler.

mod error;
mod pipeline;
mod settings;

pub use error::NodeError;
pub use pipeline::{Pipeline, ShutdownReport};
pub use settings::{
    BusConfig, DistanceConfig, LogFormat, LoggingConfig, NodeConfig, SensorConfig, StoreConfig,
    UplinkConfig, DEFAULT_CONFIG_FILE, ENV_PREFIX,
};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Initialize logging
pub fn init_logging(config: &LoggingConfig) -> Result<(), NodeError> {
    let level: Level = config
        .level
        .parse()
        .map_err(|_| NodeError::Logging(format!("unknown level '{}'", config.level)))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let installed = match config.format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    };
    installed.map_err(|e| NodeError::Logging(e.to_string()))
}

/// Install the process-wide metrics recorder.
///
/// No listener is started; the handle renders a text snapshot on demand.
pub fn install_metrics() -> Result<PrometheusHandle, NodeError> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| NodeError::Metrics(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_unknown_log_level() {
        let config = LoggingConfig {
            level: "loud".to_string(),
            format: LogFormat::Text,
        };
        assert!(matches!(init_logging(&config), Err(NodeError::Logging(_))));
    }
}
