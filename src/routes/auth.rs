// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sign-in and sign-out routes.

use crate::access::landing_route;
use crate::error::{AppError, Result};
use crate::models::Profile;
use crate::AppState;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/sign-out", post(sign_out))
}

/// Sign-in request body.
#[derive(Deserialize, Validate)]
pub struct SignInRequest {
    #[validate(email(message = "must be a valid email address"))]
    email: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    password: String,
}

/// Successful sign-in: the profile plus where the front end should go next.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SignInResponse {
    pub profile: Profile,
    pub landing_route: String,
}

async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SignInRequest>,
) -> Result<Json<SignInResponse>> {
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let profile = state
        .authenticator
        .sign_in(body.email.trim(), &body.password)
        .await?;

    state.redirects.reset();
    state.idle.touch();

    Ok(Json(SignInResponse {
        landing_route: landing_route(profile.role).to_string(),
        profile,
    }))
}

async fn sign_out(State(state): State<Arc<AppState>>) -> Result<StatusCode> {
    state.authenticator.sign_out().await?;
    Ok(StatusCode::NO_CONTENT)
}
