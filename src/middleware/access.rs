// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route-level view guard and activity tracking.

use crate::access::{guard_view, GuardDecision, View, LOGIN_ROUTE};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

/// Middleware gating role-restricted views.
///
/// Nothing protected is rendered while the session store is initializing;
/// the caller gets a neutral loading response instead.
pub async fn require_view(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(view) = View::from_path(request.uri().path()) else {
        tracing::warn!(path = %request.uri().path(), "Guard applied to unknown view");
        return Redirect::to(LOGIN_ROUTE).into_response();
    };

    let snapshot = state.store.snapshot();
    match guard_view(&snapshot, view.allowed_roles()) {
        GuardDecision::Loading => loading_response(),
        GuardDecision::RedirectToLogin => {
            tracing::debug!(
                view = view.name(),
                user_id = snapshot.user_id().unwrap_or("-"),
                "View access denied"
            );
            Redirect::to(LOGIN_ROUTE).into_response()
        }
        GuardDecision::Render => {
            if let Some(profile) = snapshot.profile {
                request.extensions_mut().insert(profile);
            }
            request.extensions_mut().insert(view);
            next.run(request).await
        }
    }
}

/// Neutral "still loading" response shown before the session is known.
pub fn loading_response() -> Response {
    let mut response = (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "status": "loading" })),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
    response
}

/// Record operator activity for the idle monitor. Health probes don't count.
pub async fn track_activity(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if request.uri().path() != "/health" {
        state.idle.touch();
    }
    next.run(request).await
}
