//! Uplink Connectivity Simulator
//!
//! Simulates the connect / acquire-IP / drop lifecycle of a radio link with
//! three chained one-shot timers. Every state change is published on an
//! [`event_bus::EventBus`] under [`LINK_EVENT_BASE`].
//!
//! This is not a network stack: nothing is negotiated and `send` only
//! checks that the simulated link is up.

mod config;
mod error;
mod machine;
mod timer;

pub use config::LinkConfig;
pub use error::LinkError;
pub use machine::{LinkHandle, LinkStateMachine};

use event_bus::{EventBase, EventId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Event base used for every link event
pub const LINK_EVENT_BASE: EventBase = EventBase("LINK_SIM");

/// Connectivity state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkState {
    Uninitialized,
    Initialized,
    Connected,
    ConnectedWithIp,
    Disconnected,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkState::Uninitialized => "NOT_INITIALIZED",
            LinkState::Initialized => "INITIALIZED",
            LinkState::Connected => "CONNECTED",
            LinkState::ConnectedWithIp => "CONNECTED_WITH_IP",
            LinkState::Disconnected => "DISCONNECTED",
        };
        f.write_str(name)
    }
}

/// Events posted on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum LinkEvent {
    /// Association done, no address yet
    Connected = 0,
    /// Address acquired, data can flow
    GotIp = 1,
    /// Link dropped (timer or explicit)
    Disconnected = 2,
}

impl LinkEvent {
    /// Bus event id
    pub fn id(self) -> EventId {
        self as EventId
    }

    /// Decode a bus event id
    pub fn from_id(id: EventId) -> Option<Self> {
        match id {
            0 => Some(LinkEvent::Connected),
            1 => Some(LinkEvent::GotIp),
            2 => Some(LinkEvent::Disconnected),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_id_mapping() {
        for event in [LinkEvent::Connected, LinkEvent::GotIp, LinkEvent::Disconnected] {
            assert_eq!(LinkEvent::from_id(event.id()), Some(event));
        }
        assert_eq!(LinkEvent::from_id(7), None);
    }

    #[test]
    fn test_state_names() {
        assert_eq!(LinkState::ConnectedWithIp.to_string(), "CONNECTED_WITH_IP");
        assert_eq!(LinkState::Uninitialized.to_string(), "NOT_INITIALIZED");
    }
}
