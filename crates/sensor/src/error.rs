//! Sensor Error Types

use thiserror::Error;

/// Errors that can occur while reading a sensor
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SensorError {
    /// Bus transaction failed or the device did not answer
    #[error("{sensor} read failed: {details}")]
    ReadFailed {
        sensor: &'static str,
        details: String,
    },

    /// CRC of a received word did not match
    #[error("Checksum mismatch: expected {expected:02X}, got {actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    /// Reading outside the trusted range of the device
    #[error("Value {value} is out of range ({min}, {max})")]
    OutOfRange { value: f32, min: f32, max: f32 },
}
