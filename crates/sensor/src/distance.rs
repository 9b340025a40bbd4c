//! ADC voltage source and GP2Y0A41SK0F distance curve

use crate::error::SensorError;
use crate::VoltageSource;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Largest 12-bit ADC count
pub const ADC_MAX_COUNT: u16 = 4095;

/// Voltage at full-scale count
pub const ADC_FULL_SCALE_V: f32 = 5.0;

/// 12-bit ADC count to volts
pub fn adc_to_voltage(raw: u16) -> f32 {
    raw as f32 / ADC_MAX_COUNT as f32 * ADC_FULL_SCALE_V
}

/// Inverse-voltage fit `distance = a / (v - c) - b` (centimetres)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceCurve {
    pub a: f32,
    pub b: f32,
    pub c: f32,
}

impl Default for DistanceCurve {
    fn default() -> Self {
        Self {
            a: 13.0,
            b: 0.42,
            c: 0.0,
        }
    }
}

impl DistanceCurve {
    pub fn distance_cm(&self, voltage: f32) -> f32 {
        self.a / (voltage - self.c) - self.b
    }
}

/// Simulated ADC channel wired to an IR distance sensor.
///
/// Counts span the whole 12-bit range, so a share of readings falls
/// outside the sensor's trusted output and must be filtered by the caller.
pub struct SimulatedAdc {
    seed: u64,
    reads: u64,
}

impl SimulatedAdc {
    pub fn new(seed: u64) -> Self {
        Self { seed, reads: 0 }
    }

    pub fn reads(&self) -> u64 {
        self.reads
    }

    fn next_count(&mut self) -> u16 {
        let mut hasher = DefaultHasher::new();
        self.seed.hash(&mut hasher);
        self.reads.hash(&mut hasher);
        self.reads += 1;
        (hasher.finish() % (ADC_MAX_COUNT as u64 + 1)) as u16
    }
}

impl VoltageSource for SimulatedAdc {
    fn read_voltage(&mut self) -> Result<f32, SensorError> {
        Ok(adc_to_voltage(self.next_count()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adc_scaling() {
        assert_eq!(adc_to_voltage(0), 0.0);
        assert!((adc_to_voltage(ADC_MAX_COUNT) - 5.0).abs() < f32::EPSILON);
        assert!((adc_to_voltage(2048) - 2.5006).abs() < 0.001);
    }

    #[test]
    fn test_curve() {
        let curve = DistanceCurve {
            a: 10.0,
            b: 1.0,
            c: 0.5,
        };
        // 10 / (2.5 - 0.5) - 1 = 4
        assert!((curve.distance_cm(2.5) - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_closer_objects_read_higher_voltage() {
        let curve = DistanceCurve::default();
        assert!(curve.distance_cm(3.0) < curve.distance_cm(0.5));
    }

    #[test]
    fn test_simulated_adc_in_range() {
        let mut adc = SimulatedAdc::new(3);
        for _ in 0..100 {
            let v = adc.read_voltage().unwrap();
            assert!((0.0..=5.0).contains(&v));
        }
        assert_eq!(adc.reads(), 100);
    }
}
