//! SHTC3 Temperature/Humidity Sensor
//!
//! Frame decoding follows the Sensirion datasheet: each 16-bit word is
//! followed by a CRC-8 (polynomial 0x31, init 0xFF). A measurement frame is
//! `[T_hi, T_lo, T_crc, RH_hi, RH_lo, RH_crc]`.

use crate::error::SensorError;
use crate::sample::Sample;
use crate::DualChannelSensor;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tracing::{debug, trace};

/// Default I2C address
pub const DEFAULT_ADDRESS: u8 = 0x70;

/// Command words
pub mod command {
    pub const WAKEUP: u16 = 0x3517;
    /// Temperature first, clock stretching, normal mode
    pub const MEASURE_T_RH_NORMAL: u16 = 0x7CA2;
    /// Temperature first, clock stretching, low power mode
    pub const MEASURE_T_RH_LOW_POWER: u16 = 0x6458;
}

const CRC8_POLYNOMIAL: u8 = 0x31;
const CRC8_INIT: u8 = 0xFF;

/// CRC-8 over `data`
pub fn crc8(data: &[u8]) -> u8 {
    data.iter().fold(CRC8_INIT, |mut crc, &byte| {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ CRC8_POLYNOMIAL
            } else {
                crc << 1
            };
        }
        crc
    })
}

/// Verify the checksum of one received word
pub fn check_crc(word: &[u8], checksum: u8) -> Result<(), SensorError> {
    let expected = crc8(word);
    if expected != checksum {
        return Err(SensorError::ChecksumMismatch {
            expected,
            actual: checksum,
        });
    }
    Ok(())
}

/// Raw ticks to degrees Celsius
pub fn raw_to_celsius(raw: u16) -> f32 {
    175.0 * raw as f32 / 65536.0 - 45.0
}

/// Raw ticks to relative humidity (%)
pub fn raw_to_humidity(raw: u16) -> f32 {
    100.0 * raw as f32 / 65536.0
}

pub fn celsius_to_raw(celsius: f32) -> u16 {
    ((celsius + 45.0) * 65536.0 / 175.0).round().clamp(0.0, 65535.0) as u16
}

pub fn humidity_to_raw(humidity: f32) -> u16 {
    (humidity * 65536.0 / 100.0).round().clamp(0.0, 65535.0) as u16
}

/// Decode a 6-byte measurement frame into (temperature, humidity)
pub fn decode_measurement(frame: &[u8; 6]) -> Result<Sample, SensorError> {
    check_crc(&frame[0..2], frame[2])?;
    check_crc(&frame[3..5], frame[5])?;

    let raw_temp = u16::from_be_bytes([frame[0], frame[1]]);
    let raw_hum = u16::from_be_bytes([frame[3], frame[4]]);

    Ok(Sample::new(raw_to_celsius(raw_temp), raw_to_humidity(raw_hum)))
}

/// Build the frame the device would return for the given values
pub fn encode_measurement(celsius: f32, humidity: f32) -> [u8; 6] {
    let t = celsius_to_raw(celsius).to_be_bytes();
    let rh = humidity_to_raw(humidity).to_be_bytes();
    [t[0], t[1], crc8(&t), rh[0], rh[1], crc8(&rh)]
}

/// Measurement power mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementMode {
    #[default]
    Normal,
    LowPower,
}

impl MeasurementMode {
    pub fn command(&self) -> u16 {
        match self {
            MeasurementMode::Normal => command::MEASURE_T_RH_NORMAL,
            MeasurementMode::LowPower => command::MEASURE_T_RH_LOW_POWER,
        }
    }
}

/// Simulated SHTC3 producing plausible indoor readings.
///
/// Frames are synthesized then decoded through [`decode_measurement`], so a
/// corrupted frame surfaces as a `ChecksumMismatch` just like on the bus.
pub struct Shtc3Simulator {
    address: u8,
    mode: MeasurementMode,
    seed: u64,
    reads: u64,
    /// Corrupt the CRC of every n-th frame
    fault_every: Option<u64>,
}

impl Shtc3Simulator {
    pub fn new(seed: u64) -> Self {
        debug!("Creating simulated SHTC3 at 0x{:02X}", DEFAULT_ADDRESS);
        Self {
            address: DEFAULT_ADDRESS,
            mode: MeasurementMode::Normal,
            seed,
            reads: 0,
            fault_every: None,
        }
    }

    pub fn with_mode(mut self, mode: MeasurementMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_fault_every(mut self, n: u64) -> Self {
        self.fault_every = (n > 0).then_some(n);
        self
    }

    /// Number of measurements taken
    pub fn reads(&self) -> u64 {
        self.reads
    }

    fn next_frame(&mut self) -> [u8; 6] {
        let mut hasher = DefaultHasher::new();
        self.seed.hash(&mut hasher);
        self.reads.hash(&mut hasher);
        let hash = hasher.finish();

        // 18.0-28.0 °C, 30.0-60.0 %RH
        let celsius = 18.0 + (hash % 1000) as f32 / 100.0;
        let humidity = 30.0 + ((hash >> 16) % 3000) as f32 / 100.0;
        encode_measurement(celsius, humidity)
    }
}

impl DualChannelSensor for Shtc3Simulator {
    fn name(&self) -> &'static str {
        "SHTC3"
    }

    fn read(&mut self) -> Result<Sample, SensorError> {
        self.reads += 1;
        trace!(
            "SHTC3@0x{:02X}: wakeup {:04X}, measure {:04X}",
            self.address,
            command::WAKEUP,
            self.mode.command()
        );

        let mut frame = self.next_frame();
        if let Some(n) = self.fault_every {
            if self.reads % n == 0 {
                frame[2] ^= 0xFF;
            }
        }
        decode_measurement(&frame)
    }
}
