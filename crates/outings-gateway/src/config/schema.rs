use serde::Deserialize;
use outings_core::error::{RealtimeError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub messaging: MessagingSection,

    #[serde(default)]
    pub push: PushSection,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(RealtimeError::UnsupportedVersion);
        }

        self.gateway.validate()?;
        self.messaging.validate()?;
        self.push.validate()?;

        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            version: 1,
            gateway: GatewaySection::default(),
            messaging: MessagingSection::default(),
            push: PushSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,

    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            ping_interval_ms: default_ping_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            max_frame_bytes: default_max_frame_bytes(),
            outbound_queue: default_outbound_queue(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        if !(5000..=120000).contains(&self.ping_interval_ms) {
            return Err(RealtimeError::BadRequest(
                "gateway.ping_interval_ms must be between 5000 and 120000".into(),
            ));
        }
        if !(10000..=600000).contains(&self.idle_timeout_ms) {
            return Err(RealtimeError::BadRequest(
                "gateway.idle_timeout_ms must be between 10000 and 600000".into(),
            ));
        }
        if self.idle_timeout_ms <= self.ping_interval_ms {
            return Err(RealtimeError::BadRequest(
                "gateway.idle_timeout_ms must be greater than ping_interval_ms".into(),
            ));
        }
        if !(1024..=1_048_576).contains(&self.max_frame_bytes) {
            return Err(RealtimeError::BadRequest(
                "gateway.max_frame_bytes must be between 1024 and 1048576".into(),
            ));
        }
        if self.outbound_queue < 16 {
            return Err(RealtimeError::BadRequest(
                "gateway.outbound_queue must be at least 16".into(),
            ));
        }
        Ok(())
    }
}

/// Whose word decides `senderId` on `send_message`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderPolicy {
    /// The resolved connection identity wins; a client value is only used
    /// for anonymous connections.
    #[default]
    Connection,
    /// A client-supplied `senderId` wins when present.
    Client,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessagingSection {
    #[serde(default)]
    pub sender_policy: SenderPolicy,

    #[serde(default = "default_reliable_timeout_ms")]
    pub reliable_timeout_ms: u64,
}

impl Default for MessagingSection {
    fn default() -> Self {
        Self {
            sender_policy: SenderPolicy::default(),
            reliable_timeout_ms: default_reliable_timeout_ms(),
        }
    }
}

impl MessagingSection {
    pub fn validate(&self) -> Result<()> {
        if !(10..=30000).contains(&self.reliable_timeout_ms) {
            return Err(RealtimeError::BadRequest(
                "messaging.reliable_timeout_ms must be between 10 and 30000".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PushSection {
    #[serde(default = "default_push_title")]
    pub title: String,

    /// HTTP relay URL. `None` keeps push log-only.
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_push_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for PushSection {
    fn default() -> Self {
        Self {
            title: default_push_title(),
            endpoint: None,
            timeout_ms: default_push_timeout_ms(),
        }
    }
}

impl PushSection {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(RealtimeError::BadRequest("push.title must not be empty".into()));
        }
        if let Some(ep) = &self.endpoint {
            if !(ep.starts_with("http://") || ep.starts_with("https://")) {
                return Err(RealtimeError::BadRequest(
                    "push.endpoint must be an http(s) URL".into(),
                ));
            }
        }
        if !(100..=60000).contains(&self.timeout_ms) {
            return Err(RealtimeError::BadRequest(
                "push.timeout_ms must be between 100 and 60000".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:4000".into()
}
fn default_ping_interval_ms() -> u64 {
    20000
}
fn default_idle_timeout_ms() -> u64 {
    60000
}
fn default_max_frame_bytes() -> usize {
    65536
}
fn default_outbound_queue() -> usize {
    1024
}
fn default_reliable_timeout_ms() -> u64 {
    1500
}
fn default_push_title() -> String {
    "New message".into()
}
fn default_push_timeout_ms() -> u64 {
    5000
}
