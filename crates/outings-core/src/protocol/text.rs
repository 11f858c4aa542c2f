//! Inbound envelope (JSON).
//!
//! The envelope stores `data` as `RawValue` so the payload is parsed once,
//! into the concrete type of the named event.

use serde::Deserialize;
use serde_json::value::RawValue;

/// Inbound envelope (Text frame).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Envelope {
    /// Protocol version.
    pub v: u8,
    /// Event name (field name is `type` in JSON).
    #[serde(rename = "type")]
    pub event: String,
    /// Optional payload, stored as raw JSON (lazy parsing).
    #[serde(default)]
    pub data: Option<Box<RawValue>>,
}
