// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! GoTrue identity provider client.
//!
//! Handles:
//! - Password sign-in against the hosted auth endpoint
//! - Session renewal with the refresh token
//! - Server-side sign-out
//! - Lifecycle event fan-out to subscribers
//! - Optional persistence of the session between runs

use crate::config::Config;
use crate::db::postgrest::BearerSource;
use crate::error::AppError;
use crate::models::{AuthEvent, Identity};
use crate::services::identity::{AuthEventHub, AuthSubscription, IdentityProvider};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::{Mutex, RwLock};

const HTTP_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Margin before access token expiration when a snapshot read renews it.
const SESSION_REFRESH_MARGIN_SECS: i64 = 60;

/// Token grant response from GoTrue.
#[derive(Debug, Clone, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: GoTrueUser,
}

#[derive(Debug, Clone, Deserialize)]
struct GoTrueUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

/// Only `exp` matters when reading expiry out of an access token.
#[derive(Deserialize)]
struct ExpiryClaims {
    exp: i64,
}

/// HTTP client for a GoTrue-compatible auth endpoint.
pub struct GoTrueClient {
    http: reqwest::Client,
    auth_url: String,
    anon_key: String,
    session: RwLock<Option<Identity>>,
    /// Serializes refreshes so a refresh token is only spent once.
    refresh_lock: Mutex<()>,
    session_file: Option<PathBuf>,
    events: AuthEventHub,
}

impl GoTrueClient {
    /// Create a client for `{backend_url}/auth/v1`.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http,
            auth_url: format!("{}/auth/v1", config.backend_url.trim_end_matches('/')),
            anon_key: config.anon_key.clone(),
            session: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            session_file: config.session_file.clone(),
            events: AuthEventHub::new(),
        })
    }

    /// Load a session persisted by a previous run, if any.
    ///
    /// Unreadable or corrupt files are ignored; the operator just signs in again.
    pub async fn restore_persisted_session(&self) -> Option<Identity> {
        let path = self.session_file.as_ref()?;
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "Failed to read session file");
                return None;
            }
        };

        match serde_json::from_str::<Identity>(&raw) {
            Ok(identity) => {
                tracing::info!(user_id = %identity.id, "Restored persisted session");
                *self.session.write().await = Some(identity.clone());
                Some(identity)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring corrupt session file");
                None
            }
        }
    }

    async fn persist(&self, identity: Option<&Identity>) {
        let Some(path) = &self.session_file else {
            return;
        };

        let result = match identity {
            Some(identity) => match serde_json::to_vec(identity) {
                Ok(bytes) => tokio::fs::write(path, bytes).await,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to serialize session");
                    return;
                }
            },
            None => match tokio::fs::remove_file(path).await {
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                other => other,
            },
        };

        if let Err(e) = result {
            tracing::warn!(error = %e, path = %path.display(), "Failed to update session file");
        }
    }

    async fn store_session(&self, identity: Option<Identity>) {
        self.persist(identity.as_ref()).await;
        *self.session.write().await = identity;
    }

    async fn token_grant<B: Serialize>(
        &self,
        grant_type: &str,
        body: &B,
    ) -> Result<TokenResponse, AppError> {
        let response = self
            .http
            .post(format!("{}/token", self.auth_url))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.anon_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::remote(None, format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = error_message(response).await;
            return Err(AppError::remote(Some(status), message));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::remote(None, format!("Failed to parse token response: {}", e)))
    }
}

#[async_trait]
impl IdentityProvider for GoTrueClient {
    async fn current_session(&self) -> Result<Option<Identity>, AppError> {
        let current = self.session.read().await.clone();
        match current {
            Some(identity)
                if identity.expires_within(
                    Utc::now(),
                    Duration::seconds(SESSION_REFRESH_MARGIN_SECS),
                ) =>
            {
                tracing::info!(user_id = %identity.id, "Stored session expiring, refreshing");
                self.refresh_session().await
            }
            other => Ok(other),
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AppError> {
        let grant = PasswordGrant { email, password };
        let tokens = match self.token_grant("password", &grant).await {
            Ok(tokens) => tokens,
            Err(AppError::Remote {
                status: Some(400 | 401 | 422),
                message,
            }) => {
                tracing::info!("Sign-in rejected by identity provider");
                return Err(AppError::Authentication(message));
            }
            Err(e) => return Err(e),
        };

        let identity = identity_from_tokens(tokens);
        self.store_session(Some(identity.clone())).await;

        tracing::info!(user_id = %identity.id, "Signed in");
        self.events.emit(AuthEvent::signed_in(identity.clone()));
        Ok(identity)
    }

    /// Without a local session there is no token to revoke, so no logout
    /// request is sent and only `signed-out` is emitted.
    async fn sign_out(&self) -> Result<(), AppError> {
        let previous = self.session.write().await.take();
        self.persist(None).await;

        let Some(identity) = previous else {
            self.events.emit(AuthEvent::signed_out());
            return Ok(());
        };

        let result = self
            .http
            .post(format!("{}/logout", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(&identity.access_token)
            .send()
            .await;

        // Local state is gone either way.
        self.events.emit(AuthEvent::signed_out());

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::info!(user_id = %identity.id, "Signed out");
                Ok(())
            }
            Ok(response) => {
                let status = response.status().as_u16();
                let message = error_message(response).await;
                tracing::warn!(status, error = %message, "Remote sign-out failed");
                Err(AppError::remote(Some(status), message))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Remote sign-out request failed");
                Err(AppError::remote(None, format!("Sign-out request failed: {}", e)))
            }
        }
    }

    async fn refresh_session(&self) -> Result<Option<Identity>, AppError> {
        let _guard = self.refresh_lock.lock().await;

        let Some(current) = self.session.read().await.clone() else {
            return Ok(None);
        };

        let grant = RefreshGrant {
            refresh_token: &current.refresh_token,
        };
        let tokens = match self.token_grant("refresh_token", &grant).await {
            Ok(tokens) => tokens,
            Err(e @ AppError::Remote { status: Some(400 | 401), .. }) => {
                // The refresh token is dead, so the access token is too.
                tracing::warn!(user_id = %current.id, error = %e, "Refresh token rejected, dropping session");
                self.store_session(None).await;
                self.events.emit(AuthEvent::signed_out());
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(user_id = %current.id, error = %e, "Session refresh failed");
                return Err(e);
            }
        };

        let identity = identity_from_tokens(tokens);
        self.store_session(Some(identity.clone())).await;

        tracing::info!(user_id = %identity.id, "Session refreshed");
        self.events.emit(AuthEvent::token_refreshed(identity.clone()));
        Ok(Some(identity))
    }

    fn subscribe(&self) -> AuthSubscription {
        self.events.subscribe()
    }
}

#[async_trait]
impl BearerSource for GoTrueClient {
    async fn bearer_token(&self) -> Option<String> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|identity| identity.access_token.clone())
    }
}

fn identity_from_tokens(tokens: TokenResponse) -> Identity {
    let expires_at = tokens
        .expires_at
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .or_else(|| {
            tokens
                .expires_in
                .map(|secs| Utc::now() + Duration::seconds(secs))
        })
        .or_else(|| access_token_expiry(&tokens.access_token));

    Identity {
        id: tokens.user.id,
        email: tokens.user.email,
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_at,
    }
}

/// Read the `exp` claim of an access token without verifying its signature.
///
/// The token is only ever sent back to the issuer, which does the verifying.
pub fn access_token_expiry(access_token: &str) -> Option<DateTime<Utc>> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<ExpiryClaims>(access_token, &DecodingKey::from_secret(&[]), &validation)
        .ok()?;
    DateTime::from_timestamp(data.claims.exp, 0)
}

/// GoTrue has used several error body shapes over the years.
async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|key| v.get(*key).and_then(|m| m.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| format!("HTTP {}: {}", status, body))
}
