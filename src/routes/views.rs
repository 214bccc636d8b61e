// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Console entry point and role-restricted views.
//!
//! View handlers only describe what the front end should render; access is
//! decided by the `require_view` middleware before they run.

use crate::access::{entry_redirect, EntryDecision, View, LOGIN_ROUTE};
use crate::middleware::access::loading_response;
use crate::models::Profile;
use crate::AppState;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Routes reachable without a session.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(entry))
        .route(LOGIN_ROUTE, get(login))
}

/// One route per protected view. The caller layers the guard on top.
pub fn protected_routes() -> Router<Arc<AppState>> {
    View::ALL
        .into_iter()
        .fold(Router::new(), |router, view| {
            router.route(view.path(), get(render_view))
        })
}

/// Root entry: send the operator to their landing view or to login.
async fn entry(State(state): State<Arc<AppState>>) -> Response {
    match entry_redirect(&state.store.snapshot()) {
        EntryDecision::Loading => loading_response(),
        EntryDecision::Redirect(route) => Redirect::to(route).into_response(),
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginView {
    pub view: String,
    pub sign_in: String,
}

async fn login() -> Json<LoginView> {
    Json(LoginView {
        view: "login".to_string(),
        sign_in: "/auth/sign-in".to_string(),
    })
}

/// What a granted view renders for the current operator.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ViewResponse {
    pub view: String,
    pub path: String,
    pub role: String,
    pub full_name: Option<String>,
}

async fn render_view(
    Extension(view): Extension<View>,
    Extension(profile): Extension<Profile>,
) -> Json<ViewResponse> {
    Json(ViewResponse {
        view: view.name().to_string(),
        path: view.path().to_string(),
        role: profile.role.to_string(),
        full_name: profile.full_name,
    })
}
