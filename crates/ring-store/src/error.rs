//! Backlog Store Error Types

use thiserror::Error;

/// Errors returned by [`RingStore`](crate::RingStore) operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Backing storage could not be allocated
    #[error("Out of memory allocating {capacity} byte backlog")]
    OutOfMemory { capacity: usize },

    /// Write larger than the remaining free space (or a zero capacity)
    #[error("Invalid size: {requested} bytes requested, {free} bytes free")]
    InvalidSize { requested: usize, free: usize },

    /// Read larger than the data currently held
    #[error("No data: {requested} bytes requested, {available} bytes available")]
    NoData { requested: usize, available: usize },

    /// Store used after `destroy()` without a new `init()`
    #[error("Backlog store has been destroyed")]
    Destroyed,
}
