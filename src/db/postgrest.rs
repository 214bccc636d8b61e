// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! PostgREST client wrapper with typed operations.
//!
//! Provides the row-store operations the session core depends on:
//! - Profiles (role lookup by identity id)
//! - Attendance (audit rows opened at sign-in, closed at sign-out)

use crate::db::{tables, AttendanceStore, ProfileResolver};
use crate::error::AppError;
use crate::models::{AttendanceClose, AttendanceRecord, Profile};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Supplies the bearer token of the signed-in operator, if any.
///
/// Row-level security on the backend keys off this token; requests fall
/// back to the anon key when nobody is signed in.
#[async_trait]
pub trait BearerSource: Send + Sync {
    async fn bearer_token(&self) -> Option<String>;
}

/// PostgREST database client.
#[derive(Clone)]
pub struct PostgrestDb {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    bearer: Option<Arc<dyn BearerSource>>,
}

impl PostgrestDb {
    /// Create a client for `{backend_url}/rest/v1`.
    pub fn new(backend_url: &str, anon_key: &str) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http,
            base_url: format!("{}/rest/v1", backend_url.trim_end_matches('/')),
            anon_key: anon_key.to_string(),
            bearer: None,
        })
    }

    /// Authenticate requests as the signed-in operator.
    pub fn with_bearer_source(mut self, bearer: Arc<dyn BearerSource>) -> Self {
        self.bearer = Some(bearer);
        self
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    async fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let token = match &self.bearer {
            Some(source) => source.bearer_token().await,
            None => None,
        };
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(token.unwrap_or_else(|| self.anon_key.clone()))
    }

    // ─── Profile Operations ──────────────────────────────────────

    /// Get a profile by identity id.
    pub async fn get_profile(&self, id: &str) -> Result<Option<Profile>, AppError> {
        let url = format!(
            "{}?id=eq.{}&select=*",
            self.table_url(tables::PROFILES),
            urlencoding::encode(id)
        );

        let response = self
            .authorized(self.http.get(&url))
            .await
            .send()
            .await
            .map_err(|e| AppError::remote(None, e.to_string()))?;

        let rows: Vec<Profile> = check_response_json(response).await?;
        Ok(rows.into_iter().next())
    }

    // ─── Attendance Operations ───────────────────────────────────

    /// Insert an open attendance row.
    pub async fn insert_attendance(&self, record: &AttendanceRecord) -> Result<(), AppError> {
        let response = self
            .authorized(self.http.post(self.table_url(tables::ATTENDANCE)))
            .await
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await
            .map_err(|e| AppError::remote(None, e.to_string()))?;

        check_response(response).await
    }

    /// Set `check_out` on every open attendance row of `user_id`.
    pub async fn close_open_attendance(
        &self,
        user_id: &str,
        check_out: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let url = format!(
            "{}?user_id=eq.{}&check_out=is.null",
            self.table_url(tables::ATTENDANCE),
            urlencoding::encode(user_id)
        );

        let response = self
            .authorized(self.http.patch(&url))
            .await
            .header("Prefer", "return=minimal")
            .json(&AttendanceClose { check_out })
            .send()
            .await
            .map_err(|e| AppError::remote(None, e.to_string()))?;

        check_response(response).await
    }
}

#[async_trait]
impl ProfileResolver for PostgrestDb {
    async fn get_profile_by_id(&self, id: &str) -> Result<Option<Profile>, AppError> {
        self.get_profile(id).await
    }
}

#[async_trait]
impl AttendanceStore for PostgrestDb {
    async fn open_attendance(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), AppError> {
        self.insert_attendance(&AttendanceRecord {
            user_id: user_id.to_string(),
            check_in: at,
            check_out: None,
        })
        .await
    }

    async fn close_attendance(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), AppError> {
        self.close_open_attendance(user_id, at).await
    }
}

/// Check response status and return error if not successful.
async fn check_response(response: reqwest::Response) -> Result<(), AppError> {
    if response.status().is_success() {
        return Ok(());
    }
    Err(error_from_response(response).await)
}

/// Check response and parse JSON body.
async fn check_response_json<T: for<'de> serde::Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }

    response
        .json()
        .await
        .map_err(|e| AppError::remote(None, format!("JSON parse error: {}", e)))
}

/// PostgREST reports failures as `{"code": "...", "message": "..."}`.
async fn error_from_response(response: reqwest::Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or(body);

    if status.as_u16() == 401 {
        tracing::debug!(error = %message, "PostgREST rejected credentials");
    }

    AppError::remote(Some(status.as_u16()), format!("HTTP {}: {}", status, message))
}
