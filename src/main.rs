// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Lead Console API Server
//!
//! Session and authorization core of the lead-management console: signs
//! operators in against the hosted identity service, resolves their role
//! and gates the role-restricted views.

use lead_console::{
    access::RedirectSignal,
    config::Config,
    db::PostgrestDb,
    services::{AttendanceRecorder, GoTrueClient, IdleMonitor},
    session::{Authenticator, CallOptions, ResilientExecutor, SessionStore},
    AppState,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const ATTENDANCE_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Lead Console API");

    // Identity provider, seeded from the persisted session if there is one
    let gotrue = Arc::new(GoTrueClient::new(&config)?);
    if let Some(identity) = gotrue.restore_persisted_session().await {
        tracing::info!(user_id = %identity.id, "Persisted session restored");
    }

    // Row store authenticates as the signed-in operator when there is one
    let db = Arc::new(
        PostgrestDb::new(&config.backend_url, &config.anon_key)?
            .with_bearer_source(gotrue.clone()),
    );

    let (attendance, attendance_worker) = AttendanceRecorder::spawn(db.clone());

    let store = Arc::new(SessionStore::create(gotrue.clone(), db.clone()));
    let authenticator =
        Authenticator::new(store.clone(), gotrue.clone(), db.clone(), attendance);

    let redirects = Arc::new(RedirectSignal::new());
    let executor = ResilientExecutor::new(
        gotrue.clone(),
        store.clone(),
        redirects.clone(),
        CallOptions::from_config(&config),
    );

    let idle = Arc::new(IdleMonitor::new(config.idle_logout));
    let idle_task = idle.spawn(
        store.clone(),
        authenticator.clone(),
        config.idle_check_interval,
    );
    tracing::info!(
        idle_logout_secs = config.idle_logout.as_secs(),
        "Idle monitor started"
    );

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        store: store.clone(),
        authenticator,
        executor,
        redirects,
        idle,
    });

    // Build router
    let app = lead_console::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down");
    idle_task.abort();
    store.dispose();
    // Give queued attendance writes a moment to drain.
    drop(store);
    match tokio::time::timeout(ATTENDANCE_DRAIN_TIMEOUT, attendance_worker).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "Attendance worker ended abnormally"),
        Err(_) => tracing::warn!("Attendance queue not drained before shutdown"),
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lead_console=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
