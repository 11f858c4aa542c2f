//! Transport layer (WebSocket).
//!
//! Exposes the WS upgrade handler and the codec that turns frames into typed
//! session events before they reach the connection loop.

pub mod codec;
pub mod ws;
