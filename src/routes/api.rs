// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session introspection API.

use crate::access::granted_views;
use crate::error::{AppError, Result};
use crate::models::Profile;
use crate::session::Readiness;
use crate::time_utils::format_opt_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Session API routes. These are public: they describe the session
/// rather than require one.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/session", get(get_session))
        .route("/api/profile/refresh", post(refresh_profile))
}

// ─── Session ─────────────────────────────────────────────────

/// Current session as seen by the console. Tokens are never exposed.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "\"initializing\" | \"ready\""))]
    pub readiness: Readiness,
    pub authenticated: bool,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub expires_at: Option<String>,
    pub profile: Option<Profile>,
    pub views: Vec<String>,
    /// Forced navigation the front end should follow, if any.
    pub redirect: Option<String>,
}

async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionResponse> {
    let snapshot = state.store.snapshot();

    let views = match (&snapshot.identity, &snapshot.profile) {
        (Some(_), Some(profile)) => granted_views(profile.role)
            .into_iter()
            .map(|view| view.path().to_string())
            .collect(),
        _ => Vec::new(),
    };

    let identity = snapshot.identity.as_ref();
    Json(SessionResponse {
        readiness: snapshot.readiness,
        authenticated: snapshot.is_authenticated(),
        user_id: identity.map(|i| i.id.clone()),
        email: identity.and_then(|i| i.email.clone()),
        expires_at: format_opt_utc_rfc3339(identity.and_then(|i| i.expires_at)),
        profile: snapshot.profile.clone(),
        views,
        redirect: state.redirects.pending().map(str::to_string),
    })
}

// ─── Profile ─────────────────────────────────────────────────

/// Re-fetch the current operator's profile through the resilient executor.
async fn refresh_profile(State(state): State<Arc<AppState>>) -> Result<Json<Profile>> {
    let store = state.store.clone();
    let profile = state
        .executor
        .call(|| {
            let store = store.clone();
            async move { store.refresh_profile().await }
        })
        .await?;

    match profile {
        Some(profile) => Ok(Json(profile)),
        None => {
            let user_id = state.store.snapshot().user_id().unwrap_or("-").to_string();
            tracing::warn!(user_id = %user_id, "Profile vanished on refresh");
            Err(AppError::ProfileNotFound(user_id))
        }
    }
}
