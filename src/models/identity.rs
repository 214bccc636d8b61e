//! Identity and auth lifecycle event models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Provider-issued actor reference backing a session.
///
/// Carries the stable user id plus the raw credential material needed to
/// call the backend and to renew the session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable unique user id (UUID issued by the identity provider)
    pub id: String,
    /// Email address, if the provider returned one
    pub email: Option<String>,
    /// Bearer token for backend calls
    pub access_token: String,
    /// Token used to renew the session
    pub refresh_token: String,
    /// When the access token expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl Identity {
    /// True if the access token expires within `margin` of `now`.
    pub fn expires_within(&self, now: DateTime<Utc>, margin: chrono::Duration) -> bool {
        self.expires_at
            .map(|expires_at| now + margin >= expires_at)
            .unwrap_or(false)
    }
}

// Credentials stay out of logs.
impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Kind of identity lifecycle event emitted by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthEventKind {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// Identity lifecycle event, delivered in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    /// Session attached to the event; absent for sign-out
    pub identity: Option<Identity>,
}

impl AuthEvent {
    pub fn signed_in(identity: Identity) -> Self {
        Self {
            kind: AuthEventKind::SignedIn,
            identity: Some(identity),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            kind: AuthEventKind::SignedOut,
            identity: None,
        }
    }

    pub fn token_refreshed(identity: Identity) -> Self {
        Self {
            kind: AuthEventKind::TokenRefreshed,
            identity: Some(identity),
        }
    }
}
