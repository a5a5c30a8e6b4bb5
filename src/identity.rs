//! Connection identity supplied by the fronting auth layer.
//!
//! This server never authenticates anyone itself: the reverse proxy (or the
//! main web application) resolves the session and forwards the user id and
//! username as query parameters. Absent parameters mean an anonymous
//! connection.

use serde::Deserialize;

/// Raw identity query parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityParams {
    pub user_id: Option<i64>,
    pub username: Option<String>,
}

/// Authenticated-or-anonymous identity bound to one connection.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: Option<i64>,
    pub username: Option<String>,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self {
            id: None,
            username: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.id.is_some() && self.username.is_some()
    }

    /// Username for display; WebRTC signaling relays "Anonymous" for
    /// unauthenticated senders.
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or("Anonymous")
    }
}

impl From<IdentityParams> for Identity {
    fn from(params: IdentityParams) -> Self {
        Self {
            id: params.user_id,
            username: params.username.filter(|u| !u.trim().is_empty()),
        }
    }
}
