//! Backlog sample record

use serde::{Deserialize, Serialize};

/// Encoded size of a [`Sample`] (two little-endian `f32`)
pub const SAMPLE_SIZE: usize = 8;

/// One two-channel measurement (e.g. temperature and humidity).
///
/// Stored in the backlog as `primary` then `secondary`, 4 bytes each,
/// with no header, checksum or length prefix.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Sample {
    pub primary: f32,
    pub secondary: f32,
}

impl Sample {
    pub fn new(primary: f32, secondary: f32) -> Self {
        Self { primary, secondary }
    }

    pub fn to_bytes(&self) -> [u8; SAMPLE_SIZE] {
        let mut bytes = [0u8; SAMPLE_SIZE];
        bytes[..4].copy_from_slice(&self.primary.to_le_bytes());
        bytes[4..].copy_from_slice(&self.secondary.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8; SAMPLE_SIZE]) -> Self {
        let mut primary = [0u8; 4];
        let mut secondary = [0u8; 4];
        primary.copy_from_slice(&bytes[..4]);
        secondary.copy_from_slice(&bytes[4..]);
        Self {
            primary: f32::from_le_bytes(primary),
            secondary: f32::from_le_bytes(secondary),
        }
    }
}
