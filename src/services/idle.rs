// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Idle auto-logout.
//!
//! Profiles flagged `auto_logout` are signed out after a period without
//! operator activity. Activity is recorded by the HTTP layer on every
//! request; a background task checks the idle time periodically.

use crate::session::{Authenticator, SessionStore};
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Tracks operator activity and enforces the idle timeout.
pub struct IdleMonitor {
    last_activity: Mutex<Instant>,
    idle_timeout: Duration,
}

impl IdleMonitor {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            last_activity: Mutex::new(Instant::now()),
            idle_timeout,
        }
    }

    /// Record operator activity now.
    pub fn touch(&self) {
        if let Ok(mut last) = self.last_activity.lock() {
            *last = Instant::now();
        }
    }

    pub fn idle_for(&self) -> Duration {
        self.last_activity
            .lock()
            .map(|last| last.elapsed())
            .unwrap_or_default()
    }

    /// True if the current operator should be signed out for inactivity.
    pub fn should_sign_out(&self, store: &SessionStore) -> bool {
        let auto_logout = store
            .profile()
            .map(|profile| profile.auto_logout)
            .unwrap_or(false);
        auto_logout && self.idle_for() >= self.idle_timeout
    }

    /// Start the periodic check. Abort the returned handle to stop it.
    pub fn spawn(
        self: &Arc<Self>,
        store: Arc<SessionStore>,
        authenticator: Authenticator,
        interval: Duration,
    ) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !store.is_alive() {
                    break;
                }
                if !monitor.should_sign_out(&store) {
                    continue;
                }

                tracing::info!(
                    user_id = store.snapshot().user_id().unwrap_or("-"),
                    idle_secs = monitor.idle_for().as_secs(),
                    "Operator idle, signing out"
                );
                if let Err(e) = authenticator.sign_out().await {
                    tracing::warn!(error = %e, "Idle sign-out incomplete");
                }
                monitor.touch();
            }
        })
    }
}
