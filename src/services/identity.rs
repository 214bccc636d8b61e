// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity provider contract and lifecycle event plumbing.

use crate::error::AppError;
use crate::models::{AuthEvent, Identity};
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Capacity of the lifecycle event channel per provider.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Credential verification, session issuance/renewal and lifecycle events.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Current session snapshot, if any.
    async fn current_session(&self) -> Result<Option<Identity>, AppError>;

    /// Verify credentials and issue a session.
    ///
    /// Rejected credentials fail with [`AppError::Authentication`].
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AppError>;

    /// Revoke the current session on the server.
    async fn sign_out(&self) -> Result<(), AppError>;

    /// Renew the current session. `Ok(None)` means there was nothing to renew.
    async fn refresh_session(&self) -> Result<Option<Identity>, AppError>;

    /// Subscribe to lifecycle events. Dropping the handle unsubscribes.
    fn subscribe(&self) -> AuthSubscription;
}

/// Fan-out of lifecycle events to subscribers, in emission order.
#[derive(Clone)]
pub struct AuthEventHub {
    tx: broadcast::Sender<AuthEvent>,
}

impl Default for AuthEventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthEventHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Deliver an event to every live subscriber.
    pub fn emit(&self, event: AuthEvent) {
        tracing::debug!(kind = ?event.kind, "Emitting auth event");
        // No subscribers is fine.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> AuthSubscription {
        AuthSubscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Subscription handle returned by [`IdentityProvider::subscribe`].
pub struct AuthSubscription {
    rx: broadcast::Receiver<AuthEvent>,
}

impl AuthSubscription {
    /// Next event, or `None` once the provider is gone.
    pub async fn next(&mut self) -> Option<AuthEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Auth event subscriber lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
