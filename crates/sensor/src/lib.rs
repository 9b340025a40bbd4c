//! Sensor Shim
//!
//! Thin stand-in for the node's hardware collaborators:
//! - SHTC3 temperature/humidity frames (CRC-8 checked, datasheet conversions)
//! - 12-bit ADC voltage source and GP2Y0A41SK0F infrared distance curve
//! - Valid-range filtering of transient bad readings
//! - The 8-byte sample record stored in the offline backlog
//!
//! The simulators synthesize raw frames and counts but run them through the
//! same decoding path a bus driver would.

mod distance;
mod error;
mod range;
mod sample;
pub mod shtc3;

pub use distance::{adc_to_voltage, DistanceCurve, SimulatedAdc};
pub use error::SensorError;
pub use range::ValidRange;
pub use sample::{Sample, SAMPLE_SIZE};
pub use shtc3::{MeasurementMode, Shtc3Simulator};

/// A sensor producing a primary and a secondary reading per measurement
pub trait DualChannelSensor: Send {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Take one measurement. Errors are transient; callers skip the sample.
    fn read(&mut self) -> Result<Sample, SensorError>;
}

/// A single analog channel read as volts
pub trait VoltageSource: Send {
    fn read_voltage(&mut self) -> Result<f32, SensorError>;
}
