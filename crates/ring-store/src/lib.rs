//! Offline Backlog Store
//!
//! Provides a fixed-capacity circular byte store that holds telemetry while
//! the uplink is down. Unlike an overwrite-the-oldest ring buffer, a full
//! store rejects new data so that telemetry loss is always visible.

mod buffer;
mod error;

pub use buffer::{RingStore, DEFAULT_CAPACITY};
pub use error::StoreError;
