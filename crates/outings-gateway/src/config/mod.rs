//! Gateway config loader (strict parsing).

pub mod schema;

use std::fs;

use outings_core::error::{RealtimeError, Result};

pub use schema::{GatewayConfig, GatewaySection, MessagingSection, PushSection, SenderPolicy};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "OUTINGS_CONFIG";
/// Config file used when `OUTINGS_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "outings-realtime.yaml";

pub fn load_from_env() -> Result<GatewayConfig> {
    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<GatewayConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| RealtimeError::Internal(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<GatewayConfig> {
    let cfg: GatewayConfig = serde_yaml::from_str(s)
        .map_err(|e| RealtimeError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
