//! Sensor Acquisition
//!
//! Provides the two sampling loops of the node:
//! - [`AcquisitionTask`]: periodic two-channel sampling that buffers into the
//!   offline backlog while the link is down and drains it once the link is up
//! - [`AveragingSampler`]: wake-driven, bounded-retry averaging of a noisy
//!   analog channel

mod averaging;
mod config;
mod error;
mod flag;
mod task;
mod wake;

pub use averaging::{
    AverageReport, AveragingHandle, AveragingSampler, DistanceReadings, DATA_READY,
    DISTANCE_EVENT_BASE,
};
pub use config::{AcquisitionConfig, AveragingConfig};
pub use error::AcquisitionError;
pub use flag::{link_flag, LinkFlag, LinkFlagWriter};
pub use task::{AcquisitionHandle, AcquisitionTask, TickOutcome, TickReport};
pub use wake::WakeSignal;
