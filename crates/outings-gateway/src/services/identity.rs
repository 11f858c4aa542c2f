//! Handshake identity resolution.
//!
//! No authenticity check happens here: verification belongs to the auth
//! layer in front of the gateway, and whatever id survives it is trusted.

/// Identity-bearing parts of a transport handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Handshake {
    /// Explicit authentication field (`x-user-id` header).
    pub auth_user_id: Option<String>,
    /// Query-string fallback (`?userId=`).
    pub query_user_id: Option<String>,
}

impl Handshake {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_user(user_id: impl Into<String>) -> Self {
        Self {
            auth_user_id: Some(user_id.into()),
            query_user_id: None,
        }
    }
}

/// Auth field first, then query. Blank values count as absent; `None`
/// means the connection proceeds anonymously.
pub fn resolve_identity(handshake: &Handshake) -> Option<String> {
    [&handshake.auth_user_id, &handshake.query_user_id]
        .into_iter()
        .flatten()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .map(str::to_string)
}
