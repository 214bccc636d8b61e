// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Resilient remote call wrapper.
//!
//! Wraps a backend call with:
//! - A timeout race (never retried)
//! - Bounded recovery from expired credentials: refresh the session and
//!   re-invoke the operation from scratch
//! - Forced re-authentication when the refresh itself fails

use crate::access::{Navigator, LOGIN_ROUTE};
use crate::config::{Config, DEFAULT_CALL_RETRIES, DEFAULT_CALL_TIMEOUT_MS};
use crate::error::AppError;
use crate::services::identity::IdentityProvider;
use crate::session::SessionStore;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Per-call limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallOptions {
    /// Refresh-and-retry rounds allowed for auth-class failures
    pub retries: u32,
    /// Wall-clock budget for each attempt
    pub timeout: Duration,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            retries: DEFAULT_CALL_RETRIES,
            timeout: Duration::from_millis(DEFAULT_CALL_TIMEOUT_MS),
        }
    }
}

impl CallOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            retries: config.call_retries,
            timeout: config.call_timeout,
        }
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Executes backend calls with timeout and auth-failure recovery.
#[derive(Clone)]
pub struct ResilientExecutor {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<SessionStore>,
    navigator: Arc<dyn Navigator>,
    defaults: CallOptions,
}

impl ResilientExecutor {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        store: Arc<SessionStore>,
        navigator: Arc<dyn Navigator>,
        defaults: CallOptions,
    ) -> Self {
        Self {
            provider,
            store,
            navigator,
            defaults,
        }
    }

    pub fn defaults(&self) -> CallOptions {
        self.defaults
    }

    /// [`execute`](Self::execute) with the configured default options.
    pub async fn call<T, F, Fut>(&self, operation: F) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        self.execute(operation, self.defaults).await
    }

    /// Run `operation`, re-invoking it after a successful session refresh
    /// when it fails with an auth-class error.
    ///
    /// - Timeout: [`AppError::Timeout`], no retry.
    /// - Opaque failure: returned immediately.
    /// - Auth-class failure with budget left: one refresh, then retry.
    /// - Refresh failure: forced sign-out, [`AppError::SessionExpired`].
    /// - Auth-class failure with budget spent: the original error.
    pub async fn execute<T, F, Fut>(
        &self,
        mut operation: F,
        options: CallOptions,
    ) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let mut attempt: u32 = 0;

        loop {
            // Dropping the timed-out future discards whatever it produces later.
            let error = match tokio::time::timeout(options.timeout, operation()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(error)) => error,
                Err(_) => {
                    tracing::warn!(
                        attempt,
                        timeout_ms = options.timeout.as_millis() as u64,
                        "Remote call timed out"
                    );
                    return Err(AppError::Timeout(options.timeout));
                }
            };

            if !error.is_auth_class() {
                return Err(error);
            }

            if attempt >= options.retries {
                tracing::warn!(attempt, error = %error, "Auth failure persists, giving up");
                return Err(error);
            }

            tracing::info!(attempt, error = %error, "Auth failure, refreshing session");
            match self.provider.refresh_session().await {
                Ok(Some(_)) => {
                    attempt += 1;
                }
                Ok(None) => {
                    tracing::warn!("No session to refresh");
                    self.force_reauthentication().await;
                    return Err(AppError::SessionExpired);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Session refresh failed");
                    self.force_reauthentication().await;
                    return Err(AppError::SessionExpired);
                }
            }
        }
    }

    async fn force_reauthentication(&self) {
        if let Err(e) = self.provider.sign_out().await {
            tracing::warn!(error = %e, "Remote sign-out failed during forced logout");
        }
        self.store.clear();
        self.navigator.navigate(LOGIN_ROUTE);
    }
}
