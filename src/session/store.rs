// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authoritative holder of the current actor's session.
//!
//! The store reconciles two asynchronous identity sources into one view:
//! the provider's initial session snapshot and its ongoing lifecycle event
//! stream. All state lives in a `watch` channel, so every mutation is a
//! single atomic replace and observers see only consistent states.
//!
//! Late completions (snapshot fetch, profile resolution) hold a `Weak`
//! reference to the store internals and check liveness before writing, so
//! nothing lands in a disposed store.

use crate::db::ProfileResolver;
use crate::error::AppError;
use crate::models::{AuthEvent, AuthEventKind, Identity, Profile};
use crate::services::identity::{AuthSubscription, IdentityProvider};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio::task::AbortHandle;

/// Whether the initial snapshot has been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Readiness {
    Initializing,
    Ready,
}

/// Point-in-time view of the session.
///
/// Invariant: `profile` is never set while `identity` is absent.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub identity: Option<Identity>,
    pub profile: Option<Profile>,
    pub readiness: Readiness,
    /// Bumped by every event and local write; the initial snapshot only
    /// lands while this is still zero.
    generation: u64,
}

impl SessionSnapshot {
    fn initializing() -> Self {
        Self {
            identity: None,
            profile: None,
            readiness: Readiness::Initializing,
            generation: 0,
        }
    }

    /// Build a detached snapshot (for decisions and tests).
    pub fn new(
        identity: Option<Identity>,
        profile: Option<Profile>,
        readiness: Readiness,
    ) -> Self {
        Self {
            identity,
            profile,
            readiness,
            generation: 0,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.readiness == Readiness::Ready
    }

    /// Signed in with a resolved profile.
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some() && self.profile.is_some()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.identity.as_ref().map(|identity| identity.id.as_str())
    }

    fn clear(&mut self) {
        self.identity = None;
        self.profile = None;
        self.readiness = Readiness::Ready;
        self.generation += 1;
    }

    fn set_identity(&mut self, identity: Identity) {
        // A profile belongs to one actor; drop it if the actor changed.
        if self.user_id() != Some(identity.id.as_str()) {
            self.profile = None;
        }
        self.identity = Some(identity);
        self.generation += 1;
    }
}

struct StoreInner {
    state: watch::Sender<SessionSnapshot>,
    alive: AtomicBool,
    profiles: Arc<dyn ProfileResolver>,
    /// Identity ids with a profile resolution in flight.
    in_flight: DashMap<String, ()>,
}

impl StoreInner {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Apply `f` to the state if the store is still alive.
    fn write(&self, f: impl FnOnce(&mut SessionSnapshot)) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.state.send_modify(f);
        true
    }

    fn mark_ready(&self) {
        if !self.is_alive() {
            return;
        }
        self.state.send_if_modified(|state| {
            if state.readiness == Readiness::Ready {
                return false;
            }
            state.readiness = Readiness::Ready;
            true
        });
    }

    /// Land a resolved profile if it still belongs to the current identity.
    fn land_profile(&self, user_id: &str, profile: Profile) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.state.send_if_modified(|state| {
            if state.user_id() != Some(user_id) {
                return false;
            }
            state.profile = Some(profile);
            true
        })
    }
}

/// Session store: `{identity, profile, readiness}` for this process.
pub struct SessionStore {
    inner: Arc<StoreInner>,
    tasks: Vec<AbortHandle>,
}

impl SessionStore {
    /// Create the store, subscribe to provider events and start fetching the
    /// initial snapshot. Must be called from within a tokio runtime.
    pub fn create(
        provider: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileResolver>,
    ) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::initializing());
        let inner = Arc::new(StoreInner {
            state,
            alive: AtomicBool::new(true),
            profiles,
            in_flight: DashMap::new(),
        });

        // Subscribe before asking for the snapshot so no event falls in between.
        let subscription = provider.subscribe();
        let events = tokio::spawn(run_event_loop(Arc::downgrade(&inner), subscription));
        let snapshot = tokio::spawn(load_snapshot(Arc::downgrade(&inner), provider));

        tracing::debug!("Session store created");

        Self {
            inner,
            tasks: vec![events.abort_handle(), snapshot.abort_handle()],
        }
    }

    /// Release the event subscription and stop all pending writes.
    ///
    /// Idempotent; also runs on drop.
    pub fn dispose(&self) {
        if self.inner.alive.swap(false, Ordering::AcqRel) {
            for task in &self.tasks {
                task.abort();
            }
            tracing::debug!("Session store disposed");
        }
    }

    pub fn is_alive(&self) -> bool {
        self.inner.is_alive()
    }

    // ─── Reads ───────────────────────────────────────────────────

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.borrow().clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.inner.state.borrow().identity.clone()
    }

    pub fn profile(&self) -> Option<Profile> {
        self.inner.state.borrow().profile.clone()
    }

    pub fn readiness(&self) -> Readiness {
        self.inner.state.borrow().readiness
    }

    /// Observe state changes.
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.state.subscribe()
    }

    /// Wait until the initial snapshot has been resolved.
    pub async fn wait_until_ready(&self) -> SessionSnapshot {
        let mut rx = self.watch();
        // The sender lives in `self`, so this only fails if we are gone.
        let state = match rx.wait_for(SessionSnapshot::is_ready).await {
            Ok(state) => state.clone(),
            Err(_) => self.snapshot(),
        };
        state
    }

    // ─── Writes ──────────────────────────────────────────────────

    /// Publish a signed-in identity together with its profile in one step.
    pub fn publish(&self, identity: Identity, profile: Profile) {
        let user_id = identity.id.clone();
        let written = self.inner.write(|state| {
            state.identity = Some(identity);
            state.profile = Some(profile);
            state.readiness = Readiness::Ready;
            state.generation += 1;
        });
        if written {
            tracing::debug!(user_id = %user_id, "Session published");
        }
    }

    /// Drop identity and profile.
    pub fn clear(&self) {
        if self.inner.write(SessionSnapshot::clear) {
            tracing::debug!("Session cleared");
        }
    }

    /// Re-fetch the profile of the current identity.
    ///
    /// Returns the fresh profile; it only lands in the store if the same
    /// identity is still signed in when the fetch completes.
    pub async fn refresh_profile(&self) -> Result<Option<Profile>, AppError> {
        let Some(user_id) = self.snapshot().user_id().map(str::to_string) else {
            return Err(AppError::Unauthorized);
        };

        let profile = self.inner.profiles.get_profile_by_id(&user_id).await?;
        match &profile {
            Some(profile) => {
                if self.inner.land_profile(&user_id, profile.clone()) {
                    tracing::debug!(user_id = %user_id, role = %profile.role, "Profile refreshed");
                }
            }
            None => tracing::warn!(user_id = %user_id, "Profile vanished on refresh"),
        }
        Ok(profile)
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Fetch the provider's current session and apply it unless something newer
/// already happened.
async fn load_snapshot(store: Weak<StoreInner>, provider: Arc<dyn IdentityProvider>) {
    let result = provider.current_session().await;

    let Some(inner) = store.upgrade() else {
        return;
    };
    if !inner.is_alive() {
        return;
    }

    match result {
        Ok(Some(identity)) => {
            let user_id = identity.id.clone();
            let applied = inner.state.send_if_modified(|state| {
                if state.generation != 0 {
                    return false;
                }
                state.set_identity(identity);
                true
            });
            if applied {
                tracing::info!(user_id = %user_id, "Session restored from snapshot");
                spawn_profile_resolution(&inner, user_id);
            } else {
                tracing::debug!("Snapshot superseded by a newer auth event");
                resolve_missing_profile(&inner);
            }
        }
        Ok(None) => {
            tracing::debug!("No session in snapshot");
            resolve_missing_profile(&inner);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch session snapshot");
            resolve_missing_profile(&inner);
        }
    }

    inner.mark_ready();
}

/// An event that beat the snapshot may have set an identity without
/// resolving its profile (e.g. `token-refreshed`). Resolve it now.
fn resolve_missing_profile(inner: &Arc<StoreInner>) {
    let user_id = {
        let state = inner.state.borrow();
        match (&state.identity, &state.profile) {
            (Some(identity), None) => identity.id.clone(),
            _ => return,
        }
    };
    tracing::debug!(user_id = %user_id, "Identity without profile after snapshot, resolving");
    spawn_profile_resolution(inner, user_id);
}

/// Apply lifecycle events one at a time, in emission order.
async fn run_event_loop(store: Weak<StoreInner>, mut subscription: AuthSubscription) {
    while let Some(event) = subscription.next().await {
        let Some(inner) = store.upgrade() else {
            break;
        };
        if !inner.is_alive() {
            break;
        }
        handle_event(&inner, event);
    }
    tracing::debug!("Auth event loop finished");
}

fn handle_event(inner: &Arc<StoreInner>, event: AuthEvent) {
    let AuthEvent { kind, identity } = event;

    let identity = match (kind, identity) {
        (AuthEventKind::SignedOut, _) | (_, None) => {
            inner.write(SessionSnapshot::clear);
            tracing::debug!(kind = ?kind, "Session cleared by auth event");
            return;
        }
        (_, Some(identity)) => identity,
    };

    let user_id = identity.id.clone();
    inner.write(|state| state.set_identity(identity));

    match kind {
        AuthEventKind::SignedIn => {
            tracing::debug!(user_id = %user_id, "Signed-in event, resolving profile");
            spawn_profile_resolution(inner, user_id);
        }
        AuthEventKind::TokenRefreshed => {
            tracing::debug!(user_id = %user_id, "Token refreshed, profile kept");
        }
        AuthEventKind::SignedOut => {}
    }
}

/// Resolve the profile for `user_id` in the background, at most once at a time.
fn spawn_profile_resolution(inner: &Arc<StoreInner>, user_id: String) {
    if inner.in_flight.insert(user_id.clone(), ()).is_some() {
        tracing::debug!(user_id = %user_id, "Profile resolution already in flight");
        return;
    }

    let profiles = inner.profiles.clone();
    let store = Arc::downgrade(inner);

    tokio::spawn(async move {
        let result = profiles.get_profile_by_id(&user_id).await;

        let Some(inner) = store.upgrade() else {
            return;
        };
        inner.in_flight.remove(&user_id);

        match result {
            Ok(Some(profile)) => {
                if !inner.land_profile(&user_id, profile) {
                    tracing::debug!(user_id = %user_id, "Discarding stale profile resolution");
                }
            }
            Ok(None) => tracing::warn!(user_id = %user_id, "No profile for signed-in identity"),
            Err(e) => tracing::warn!(user_id = %user_id, error = %e, "Profile resolution failed"),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(id: &str) -> Identity {
        Identity {
            id: id.to_string(),
            email: None,
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_at: None,
        }
    }

    #[test]
    fn test_set_identity_drops_profile_of_other_actor() {
        let mut state = SessionSnapshot::initializing();
        state.identity = Some(identity("a"));
        state.profile = Some(Profile {
            id: "a".to_string(),
            role: crate::models::Role::Admin,
            status: crate::models::ProfileStatus::Active,
            full_name: None,
            salary: None,
            auto_logout: false,
            last_activity: None,
        });

        state.set_identity(identity("a"));
        assert!(state.profile.is_some(), "same actor keeps profile");

        state.set_identity(identity("b"));
        assert!(state.profile.is_none(), "new actor must not inherit profile");
        assert_eq!(state.generation, 2);
    }

    #[test]
    fn test_clear_marks_ready() {
        let mut state = SessionSnapshot::initializing();
        state.clear();
        assert!(state.is_ready());
        assert!(!state.is_authenticated());
    }
}
