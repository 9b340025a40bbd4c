//! Valid-range filter for transient bad readings

use crate::error::SensorError;
use serde::{Deserialize, Serialize};

/// Open interval `(min, max)` of readings worth keeping
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidRange {
    pub min: f32,
    pub max: f32,
}

impl Default for ValidRange {
    /// Trusted output span of the GP2Y0A41SK0F in volts
    fn default() -> Self {
        Self {
            min: 0.005,
            max: 3.2,
        }
    }
}

impl ValidRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Both bounds are exclusive
    pub fn contains(&self, value: f32) -> bool {
        value > self.min && value < self.max
    }

    pub fn check(&self, value: f32) -> Result<f32, SensorError> {
        if self.contains(value) {
            Ok(value)
        } else {
            Err(SensorError::OutOfRange {
                value,
                min: self.min,
                max: self.max,
            })
        }
    }
}
