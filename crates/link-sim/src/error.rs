//! Link Error Types

use crate::LinkState;
use thiserror::Error;

/// Errors returned by link operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// Operation not allowed in the current state
    #[error("Invalid link state: {0}")]
    InvalidState(LinkState),

    /// Command queue full on a non-blocking request
    #[error("Link command queue busy")]
    Busy,

    /// Driver task has ended
    #[error("Link driver stopped")]
    DriverStopped,
}
