//! Event Bus
//!
//! Decouples event producers (timer tasks, samplers) from consumers. Events
//! are queued in a bounded FIFO and handed to registered handlers one at a
//! time on the bus's own dispatch task, never on the producer's stack.
//!
//! Ordering is guaranteed per bus only; independent buses run independently.

mod bus;
mod error;

pub use bus::{BusHandle, EventBus, DEFAULT_QUEUE_DEPTH};
pub use error::BusError;

use std::fmt;

/// Event family, e.g. the link simulator or the distance sampler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventBase(pub &'static str);

impl fmt::Display for EventBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Event identifier within a base
pub type EventId = i32;

/// A queued event record
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub base: EventBase,
    pub id: EventId,
    pub payload: Vec<u8>,
}

impl Event {
    /// Payload length in bytes
    pub fn payload_size(&self) -> usize {
        self.payload.len()
    }
}

/// Which ids of a base a handler wants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdFilter {
    /// Every id of the base
    Any,
    /// A single id
    Id(EventId),
}

impl IdFilter {
    fn matches(&self, id: EventId) -> bool {
        match self {
            IdFilter::Any => true,
            IdFilter::Id(wanted) => *wanted == id,
        }
    }
}
