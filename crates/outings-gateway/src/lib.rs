//! Outings realtime gateway library entry.
//!
//! This crate wires the transport, the realtime egress core, the collaborator
//! backends, and the presence/messaging services into a gateway stack. It is
//! consumed by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod infra;
pub mod obs;
pub mod ops;
pub mod realtime;
pub mod router;
pub mod services;
pub mod session;
pub mod transport;
