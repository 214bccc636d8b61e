// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use crate::access::LOGIN_ROUTE;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;

/// Message fragments that mark a remote failure as a credential problem.
const AUTH_ERROR_MARKERS: &[&str] = &[
    "jwt",
    "token",
    "expired",
    "invalid api key",
    "invalid_api_key",
];

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Credentials were rejected by the identity provider.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Credentials were accepted but no profile record exists for the identity.
    #[error("No profile found for user {0}")]
    ProfileNotFound(String),

    #[error("Remote call timed out after {} ms", .0.as_millis())]
    Timeout(Duration),

    /// Credential refresh failed; the session cannot be recovered.
    #[error("Session expired, please sign in again")]
    SessionExpired,

    /// Failure reported by the hosted backend.
    #[error("Remote error: {message}")]
    Remote {
        status: Option<u16>,
        message: String,
    },

    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Retry classification for remote failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Invalid or expired credential; recoverable by a session refresh.
    Auth,
    /// Anything else; propagated as-is.
    Opaque,
}

impl AppError {
    /// Build a remote error from an HTTP status and response body.
    pub fn remote(status: Option<u16>, message: impl Into<String>) -> Self {
        AppError::Remote {
            status,
            message: message.into(),
        }
    }

    /// Classify this error for the resilient call wrapper.
    pub fn class(&self) -> ErrorClass {
        match self {
            AppError::Remote { status, message } => {
                if *status == Some(401) {
                    return ErrorClass::Auth;
                }
                let lower = message.to_lowercase();
                if AUTH_ERROR_MARKERS.iter().any(|m| lower.contains(m)) {
                    ErrorClass::Auth
                } else {
                    ErrorClass::Opaque
                }
            }
            _ => ErrorClass::Opaque,
        }
    }

    /// True when a session refresh may fix this error.
    pub fn is_auth_class(&self) -> bool {
        self.class() == ErrorClass::Auth
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let auth_class = self.is_auth_class();
        let (status, error, details) = match &self {
            AppError::SessionExpired => {
                tracing::info!("Session expired, redirecting to login");
                return Redirect::to(LOGIN_ROUTE).into_response();
            }
            AppError::Authentication(msg) => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                Some(msg.clone()),
            ),
            AppError::ProfileNotFound(_) => (StatusCode::FORBIDDEN, "profile_not_found", None),
            AppError::Timeout(_) => (
                StatusCode::GATEWAY_TIMEOUT,
                "timeout",
                Some(self.to_string()),
            ),
            AppError::Remote { .. } if auth_class => {
                (StatusCode::UNAUTHORIZED, "invalid_token", None)
            }
            AppError::Remote { status, message } => {
                tracing::error!(status = ?status, error = %message, "Remote backend error");
                (StatusCode::BAD_GATEWAY, "remote_error", None)
            }
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
