//! Link simulator configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timer delays of the simulated link
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Delay from `connect()` to `Connected` (milliseconds)
    pub connect_delay_ms: u64,

    /// Delay from `Connected` to `GotIp` (milliseconds)
    pub ip_delay_ms: u64,

    /// Delay from `GotIp` to the automatic drop (milliseconds)
    pub disconnect_delay_ms: u64,

    /// How long an event post may wait for bus queue space (milliseconds)
    pub post_timeout_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            connect_delay_ms: 5_000,
            ip_delay_ms: 3_000,
            disconnect_delay_ms: 20_000,
            post_timeout_ms: 1_000,
        }
    }
}

impl LinkConfig {
    pub fn connect_delay(&self) -> Duration {
        Duration::from_millis(self.connect_delay_ms)
    }

    pub fn ip_delay(&self) -> Duration {
        Duration::from_millis(self.ip_delay_ms)
    }

    pub fn disconnect_delay(&self) -> Duration {
        Duration::from_millis(self.disconnect_delay_ms)
    }

    pub fn post_timeout(&self) -> Duration {
        Duration::from_millis(self.post_timeout_ms)
    }
}
