//! Acquisition Error Types

use thiserror::Error;

/// Errors from the acquisition loops themselves (sample-level failures are
/// recovered inside the loops and only logged)
#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// Task panicked or was cancelled before handing its state back
    #[error("Acquisition task failed: {0}")]
    TaskFailed(String),
}

impl From<tokio::task::JoinError> for AcquisitionError {
    fn from(err: tokio::task::JoinError) -> Self {
        AcquisitionError::TaskFailed(err.to_string())
    }
}
