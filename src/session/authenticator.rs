// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sign-in and sign-out protocols on top of the session store.

use crate::db::ProfileResolver;
use crate::error::AppError;
use crate::models::Profile;
use crate::services::attendance::AttendanceRecorder;
use crate::services::identity::IdentityProvider;
use crate::session::SessionStore;
use std::sync::Arc;

/// Credential authenticator.
#[derive(Clone)]
pub struct Authenticator {
    store: Arc<SessionStore>,
    provider: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileResolver>,
    attendance: AttendanceRecorder,
}

impl Authenticator {
    pub fn new(
        store: Arc<SessionStore>,
        provider: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileResolver>,
        attendance: AttendanceRecorder,
    ) -> Self {
        Self {
            store,
            provider,
            profiles,
            attendance,
        }
    }

    /// Sign in with email and password and return the operator's profile.
    ///
    /// On rejected credentials the store is left untouched. If the
    /// credentials are accepted but no profile exists, the fresh remote
    /// session is revoked, the store is cleared and
    /// [`AppError::ProfileNotFound`] is returned.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Profile, AppError> {
        let identity = self.provider.sign_in(email, password).await?;
        let user_id = identity.id.clone();

        let profile = match self.profiles.get_profile_by_id(&user_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                tracing::warn!(user_id = %user_id, "Signed in without a profile, revoking session");
                self.revoke_orphan_session().await;
                return Err(AppError::ProfileNotFound(user_id));
            }
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    error = %e,
                    "Profile lookup failed during sign-in, revoking session"
                );
                self.revoke_orphan_session().await;
                return Err(AppError::ProfileNotFound(user_id));
            }
        };

        self.store.publish(identity, profile.clone());
        self.attendance.open(&user_id);

        tracing::info!(user_id = %user_id, role = %profile.role, "Sign-in complete");
        Ok(profile)
    }

    /// Sign out. Local state is cleared before the remote call and stays
    /// cleared even if the remote sign-out fails; that failure is returned.
    pub async fn sign_out(&self) -> Result<(), AppError> {
        let identity = self.store.identity();
        self.store.clear();

        if let Some(identity) = &identity {
            self.attendance.close(&identity.id);
        }

        self.provider.sign_out().await.inspect_err(|e| {
            tracing::warn!(error = %e, "Remote sign-out failed, local session already cleared");
        })?;

        tracing::info!(
            user_id = identity.as_ref().map(|i| i.id.as_str()).unwrap_or("-"),
            "Sign-out complete"
        );
        Ok(())
    }

    async fn revoke_orphan_session(&self) {
        if let Err(e) = self.provider.sign_out().await {
            tracing::warn!(error = %e, "Failed to revoke session without profile");
        }
        self.store.clear();
    }
}
