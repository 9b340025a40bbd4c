//! Acquisition configuration

use sensor::{DistanceCurve, ValidRange};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the periodic acquisition task
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Interval between ticks (milliseconds)
    pub period_ms: u64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self { period_ms: 1_000 }
    }
}

impl AcquisitionConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms.max(1))
    }
}

/// Configuration for the averaging sampler
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AveragingConfig {
    /// Interval between wake-ups (milliseconds)
    pub period_ms: u64,
    /// Valid readings to average per run
    pub target_samples: usize,
    /// Readings outside this open interval are discarded (volts)
    pub valid_range: ValidRange,
    /// Voltage to distance conversion
    pub curve: DistanceCurve,
    /// Depth of the averaged-result queue
    pub queue_depth: usize,
    /// How long a `DataReady` post may wait for bus space (milliseconds)
    pub post_timeout_ms: u64,
}

impl Default for AveragingConfig {
    fn default() -> Self {
        Self {
            period_ms: 1_000,
            target_samples: 10,
            valid_range: ValidRange::default(),
            curve: DistanceCurve::default(),
            queue_depth: 12,
            post_timeout_ms: 1_000,
        }
    }
}

impl AveragingConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms.max(1))
    }

    /// Attempts allowed per run before giving up (10x the target)
    pub fn max_attempts(&self) -> usize {
        self.target_samples.saturating_mul(10)
    }

    pub fn post_timeout(&self) -> Duration {
        Duration::from_millis(self.post_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_ceiling_is_ten_times_target() {
        assert_eq!(AveragingConfig::default().max_attempts(), 100);
    }

    #[test]
    fn test_attempt_ceiling_saturates() {
        let config = AveragingConfig {
            target_samples: usize::MAX / 2,
            ..AveragingConfig::default()
        };
        assert_eq!(config.max_attempts(), usize::MAX);
    }
}
