//! Event Bus Error Types

use thiserror::Error;

/// Errors returned when posting to a bus
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// Queue stayed full for the whole wait budget
    #[error("Timeout waiting for event queue space after {0}ms")]
    Timeout(u64),

    /// Queue full on a non-blocking post
    #[error("Event queue full")]
    Full,

    /// Bus has been shut down
    #[error("Event bus closed")]
    Closed,
}
