//! Node Error Types

use acquisition::AcquisitionError;
use link_sim::LinkError;
use ring_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Metrics recorder setup failed: {0}")]
    Metrics(String),

    #[error("Backlog store error: {0}")]
    Store(#[from] StoreError),

    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error("Pipeline task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
