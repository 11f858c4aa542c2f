//! Realtime services composed by the connection lifecycle controller.
//!
//! Leaves first: identity -> rooms -> presence -> messages / typing / receipts.

pub mod identity;
pub mod messages;
pub mod presence;
pub mod receipts;
pub mod rooms;
pub mod typing;

pub use identity::{resolve_identity, Handshake};
pub use messages::MessagePipeline;
pub use presence::PresenceTracker;
pub use receipts::ReadReceipts;
pub use rooms::RoomMembership;
pub use typing::TypingNotifier;
