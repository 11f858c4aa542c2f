//! Realtime runtime (egress engine) for the outings gateway.
//!
//! Connection registry + room index + QoS-based publish helpers.

pub mod core;
pub mod types;

pub use core::{Connection, ConnectionId, RealtimeCore, RoomIndex, SessionRegistry};
pub use types::{Outgoing, PreparedMsg, QoS};
