//! External collaborators behind async traits.
//!
//! The realtime layer only issues create/read/update calls against the message
//! store, reads group memberships and push tokens, and hands notifications to
//! a push gateway. In-memory implementations back development runs and tests.

pub mod membership;
pub mod message_store;
pub mod presence;
pub mod push;

pub use membership::{InMemoryMembershipStore, MembershipStore};
pub use message_store::{InMemoryMessageStore, MessageStore};
pub use presence::{InMemoryPresence, PresenceStore};
pub use push::{
    HttpPushGateway, InMemoryPushTokens, LogPushGateway, PushGateway, PushTokenStore,
};
