//! Realtime core components for the gateway runtime.
//!
//! Connection registry, room index, and the egress runtime shared by the
//! messaging services.

mod realtime;
mod room_index;
mod session_registry;

pub use realtime::RealtimeCore;
pub use room_index::RoomIndex;
pub use session_registry::{Connection, ConnectionId, SessionRegistry};
