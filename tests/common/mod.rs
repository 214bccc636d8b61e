// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory collaborators for session tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lead_console::access::{Navigator, RedirectSignal};
use lead_console::config::Config;
use lead_console::db::{AttendanceStore, ProfileResolver};
use lead_console::error::AppError;
use lead_console::models::{AuthEvent, Identity, Profile, ProfileStatus, Role};
use lead_console::routes::create_router;
use lead_console::services::{
    AttendanceRecorder, AuthEventHub, AuthSubscription, IdentityProvider, IdleMonitor,
};
use lead_console::session::{
    Authenticator, CallOptions, ResilientExecutor, SessionSnapshot, SessionStore,
};
use lead_console::AppState;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// How long tests wait for background work before giving up.
#[allow(dead_code)]
pub const WAIT: Duration = Duration::from_secs(2);

#[allow(dead_code)]
pub fn identity(id: &str) -> Identity {
    Identity {
        id: id.to_string(),
        email: Some(format!("{id}@example.com")),
        access_token: format!("access-{id}"),
        refresh_token: format!("refresh-{id}"),
        expires_at: None,
    }
}

#[allow(dead_code)]
pub fn profile(id: &str, role: Role) -> Profile {
    Profile {
        id: id.to_string(),
        role,
        status: ProfileStatus::Active,
        full_name: Some(format!("Operator {id}")),
        salary: None,
        auto_logout: false,
        last_activity: None,
    }
}

/// Wait until the store state satisfies `predicate`.
#[allow(dead_code)]
pub async fn wait_for_state(
    store: &SessionStore,
    predicate: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    let mut rx = store.watch();
    let state = tokio::time::timeout(WAIT, rx.wait_for(predicate))
        .await
        .expect("timed out waiting for session state")
        .expect("session store dropped")
        .clone();
    state
}

/// Wait until `counter` reaches `expected`.
#[allow(dead_code)]
pub async fn wait_for_count(counter: &AtomicUsize, expected: usize) {
    tokio::time::timeout(WAIT, async {
        while counter.load(Ordering::SeqCst) < expected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("timed out waiting for counter");
}

/// Give queued events and spawned tasks a chance to run.
#[allow(dead_code)]
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

// ─── Identity Provider ───────────────────────────────────────

/// Scriptable identity provider.
#[derive(Default)]
pub struct FakeIdentityProvider {
    pub events: AuthEventHub,
    session: Mutex<Option<Identity>>,
    /// Identity issued for accepted credentials
    account: Mutex<Option<Identity>>,
    /// When set, `current_session` blocks until notified
    snapshot_gate: Option<Arc<Notify>>,
    pub reject_credentials: AtomicBool,
    pub sign_out_fails: AtomicBool,
    pub refresh_fails: AtomicBool,
    pub sign_in_calls: AtomicUsize,
    pub sign_out_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
}

#[allow(dead_code)]
impl FakeIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing session (e.g. restored from disk).
    pub fn with_session(self, identity: Identity) -> Self {
        *self.session.lock().unwrap() = Some(identity);
        self
    }

    /// Accept any credentials and issue `identity`.
    pub fn with_account(self, identity: Identity) -> Self {
        *self.account.lock().unwrap() = Some(identity);
        self
    }

    /// Hold `current_session` until the returned gate is notified.
    pub fn with_snapshot_gate(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.snapshot_gate = Some(gate.clone());
        (self, gate)
    }

    pub fn session(&self) -> Option<Identity> {
        self.session.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn current_session(&self) -> Result<Option<Identity>, AppError> {
        if let Some(gate) = &self.snapshot_gate {
            gate.notified().await;
        }
        Ok(self.session())
    }

    async fn sign_in(&self, _email: &str, _password: &str) -> Result<Identity, AppError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_credentials.load(Ordering::SeqCst) {
            return Err(AppError::Authentication(
                "Invalid login credentials".to_string(),
            ));
        }
        let identity = self
            .account
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AppError::Authentication("Unknown account".to_string()))?;

        *self.session.lock().unwrap() = Some(identity.clone());
        self.events.emit(AuthEvent::signed_in(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        *self.session.lock().unwrap() = None;
        self.events.emit(AuthEvent::signed_out());
        if self.sign_out_fails.load(Ordering::SeqCst) {
            return Err(AppError::remote(Some(503), "logout unavailable"));
        }
        Ok(())
    }

    async fn refresh_session(&self) -> Result<Option<Identity>, AppError> {
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.refresh_fails.load(Ordering::SeqCst) {
            return Err(AppError::remote(Some(400), "Invalid Refresh Token"));
        }
        let Some(mut identity) = self.session() else {
            return Ok(None);
        };
        identity.access_token = format!("access-{}-refreshed-{n}", identity.id);
        *self.session.lock().unwrap() = Some(identity.clone());
        self.events.emit(AuthEvent::token_refreshed(identity.clone()));
        Ok(Some(identity))
    }

    fn subscribe(&self) -> AuthSubscription {
        self.events.subscribe()
    }
}

// ─── Profiles ────────────────────────────────────────────────

/// In-memory profile table.
#[derive(Default)]
pub struct FakeProfiles {
    rows: Mutex<HashMap<String, Profile>>,
    /// When set, every lookup blocks until notified
    gate: Option<Arc<Notify>>,
    failure: Mutex<Option<(Option<u16>, String)>>,
    pub calls: AtomicUsize,
    pub completed: AtomicUsize,
}

#[allow(dead_code)]
impl FakeProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(self, profile: Profile) -> Self {
        self.insert(profile);
        self
    }

    pub fn with_gate(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(gate.clone());
        (self, gate)
    }

    pub fn insert(&self, profile: Profile) {
        self.rows
            .lock()
            .unwrap()
            .insert(profile.id.clone(), profile);
    }

    pub fn remove(&self, id: &str) {
        self.rows.lock().unwrap().remove(id);
    }

    /// Make every following lookup fail with a remote error.
    pub fn fail_with(&self, status: Option<u16>, message: &str) {
        *self.failure.lock().unwrap() = Some((status, message.to_string()));
    }

    pub fn clear_failure(&self) {
        *self.failure.lock().unwrap() = None;
    }
}

#[async_trait]
impl ProfileResolver for FakeProfiles {
    async fn get_profile_by_id(&self, id: &str) -> Result<Option<Profile>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let failure = self.failure.lock().unwrap().clone();
        let result = match failure {
            Some((status, message)) => Err(AppError::remote(status, message)),
            None => Ok(self.rows.lock().unwrap().get(id).cloned()),
        };
        self.completed.fetch_add(1, Ordering::SeqCst);
        result
    }
}

// ─── Attendance ──────────────────────────────────────────────

/// Records attendance writes as `open:<id>` / `close:<id>`.
#[derive(Default)]
pub struct RecordingAttendance {
    pub writes: Mutex<Vec<String>>,
    pub count: AtomicUsize,
    pub fail: AtomicBool,
}

#[allow(dead_code)]
impl RecordingAttendance {
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    fn record(&self, entry: String) -> Result<(), AppError> {
        self.writes.lock().unwrap().push(entry);
        self.count.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::remote(Some(500), "attendance table unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl AttendanceStore for RecordingAttendance {
    async fn open_attendance(&self, user_id: &str, _at: DateTime<Utc>) -> Result<(), AppError> {
        self.record(format!("open:{user_id}"))
    }

    async fn close_attendance(&self, user_id: &str, _at: DateTime<Utc>) -> Result<(), AppError> {
        self.record(format!("close:{user_id}"))
    }
}

// ─── Navigation ──────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingNavigator {
    pub routes: Mutex<Vec<&'static str>>,
}

#[allow(dead_code)]
impl RecordingNavigator {
    pub fn routes(&self) -> Vec<&'static str> {
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &'static str) {
        self.routes.lock().unwrap().push(route);
    }
}

// ─── Assembled Harness ───────────────────────────────────────

/// Fully wired session core over the fakes.
#[allow(dead_code)]
pub struct Harness {
    pub provider: Arc<FakeIdentityProvider>,
    pub profiles: Arc<FakeProfiles>,
    pub attendance: Arc<RecordingAttendance>,
    pub store: Arc<SessionStore>,
    pub authenticator: Authenticator,
}

#[allow(dead_code)]
impl Harness {
    pub fn new(provider: FakeIdentityProvider, profiles: FakeProfiles) -> Self {
        let provider = Arc::new(provider);
        let profiles = Arc::new(profiles);
        let attendance = Arc::new(RecordingAttendance::default());
        let (recorder, _worker) = AttendanceRecorder::spawn(attendance.clone());

        let store = Arc::new(SessionStore::create(provider.clone(), profiles.clone()));
        let authenticator = Authenticator::new(
            store.clone(),
            provider.clone(),
            profiles.clone(),
            recorder,
        );

        Self {
            provider,
            profiles,
            attendance,
            store,
            authenticator,
        }
    }

    pub fn executor(&self, navigator: Arc<dyn Navigator>) -> ResilientExecutor {
        ResilientExecutor::new(
            self.provider.clone(),
            self.store.clone(),
            navigator,
            CallOptions::default(),
        )
    }
}

/// Create a test app over the fakes.
/// Returns the router, the shared state and the harness behind it.
#[allow(dead_code)]
pub fn create_test_app(
    provider: FakeIdentityProvider,
    profiles: FakeProfiles,
) -> (axum::Router, Arc<AppState>, Harness) {
    let config = Config::test_default();
    let harness = Harness::new(provider, profiles);

    let redirects = Arc::new(RedirectSignal::new());
    let executor = ResilientExecutor::new(
        harness.provider.clone(),
        harness.store.clone(),
        redirects.clone(),
        CallOptions::from_config(&config),
    );

    let state = Arc::new(AppState {
        idle: Arc::new(IdleMonitor::new(config.idle_logout)),
        config,
        store: harness.store.clone(),
        authenticator: harness.authenticator.clone(),
        executor,
        redirects,
    });

    (create_router(state.clone()), state, harness)
}
