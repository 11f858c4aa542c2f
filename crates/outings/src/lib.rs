//! Top-level facade crate for the outings realtime backend.
//!
//! Re-exports the protocol/domain crate and the gateway library so users can depend on a single crate.

pub mod core {
    pub use outings_core::*;
}

pub mod gateway {
    pub use outings_gateway::*;
}
