//! Wire protocol (JSON text frames in both directions).
//!
//! - Inbound: `{"v":1,"type":"<event>","data":{...}}` with `data` kept as
//!   `RawValue` until the event name is known, then parsed into a typed
//!   `ClientEvent`.
//! - Outbound: the same envelope shape, produced from `ServerEvent`.
//!
//! All parsers are panic-free: malformed input is reported as `RealtimeError`
//! and the gateway decides whether to drop it.

pub mod events;
pub mod outbound;
pub mod text;

/// Protocol version carried in every frame.
pub const PROTOCOL_VERSION: u8 = 1;

pub use events::ClientEvent;
pub use outbound::ServerEvent;
