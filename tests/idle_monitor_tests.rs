// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Idle auto-logout tests on a paused clock.

use lead_console::models::Role;
use lead_console::services::IdleMonitor;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

mod common;
use common::{identity, profile, FakeIdentityProvider, FakeProfiles, Harness};

const IDLE: Duration = Duration::from_secs(60);
const CHECK: Duration = Duration::from_secs(5);

async fn signed_in(auto_logout: bool) -> Harness {
    let mut row = profile("u1", Role::Intern);
    row.auto_logout = auto_logout;
    let h = Harness::new(
        FakeIdentityProvider::new().with_account(identity("u1")),
        FakeProfiles::new().with_profile(row),
    );
    h.store.wait_until_ready().await;
    h.authenticator.sign_in("u1@example.com", "pw").await.unwrap();
    h
}

#[tokio::test(start_paused = true)]
async fn test_idle_operator_signed_out() {
    let h = signed_in(true).await;
    let monitor = Arc::new(IdleMonitor::new(IDLE));
    let task = monitor.spawn(h.store.clone(), h.authenticator.clone(), CHECK);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(h.store.snapshot().is_authenticated());

    tokio::time::sleep(Duration::from_secs(40)).await;
    assert!(h.store.identity().is_none());
    assert_eq!(h.provider.sign_out_calls.load(Ordering::SeqCst), 1);

    task.abort();
}

#[tokio::test(start_paused = true)]
async fn test_activity_postpones_logout() {
    let h = signed_in(true).await;
    let monitor = Arc::new(IdleMonitor::new(IDLE));
    let task = monitor.spawn(h.store.clone(), h.authenticator.clone(), CHECK);

    for _ in 0..4 {
        tokio::time::sleep(Duration::from_secs(30)).await;
        monitor.touch();
    }
    assert!(h.store.snapshot().is_authenticated());
    assert_eq!(h.provider.sign_out_calls.load(Ordering::SeqCst), 0);

    task.abort();
}

#[tokio::test(start_paused = true)]
async fn test_profiles_without_auto_logout_stay_signed_in() {
    let h = signed_in(false).await;
    let monitor = Arc::new(IdleMonitor::new(IDLE));
    assert!(!monitor.should_sign_out(&h.store));

    let task = monitor.spawn(h.store.clone(), h.authenticator.clone(), CHECK);
    tokio::time::sleep(Duration::from_secs(600)).await;

    assert!(h.store.snapshot().is_authenticated());
    assert_eq!(h.provider.sign_out_calls.load(Ordering::SeqCst), 0);

    task.abort();
}
