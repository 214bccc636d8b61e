//! Database layer (PostgREST row store).
//!
//! The session core only needs two narrow capabilities from the row store,
//! expressed as traits so tests can swap in in-memory fakes.

pub mod postgrest;

pub use postgrest::PostgrestDb;

use crate::error::AppError;
use crate::models::Profile;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Table names as constants.
pub mod tables {
    pub const PROFILES: &str = "profiles";
    pub const ATTENDANCE: &str = "attendance";
}

/// Maps an authenticated identity to its application profile.
#[async_trait]
pub trait ProfileResolver: Send + Sync {
    /// Fetch the profile whose id equals the identity id.
    async fn get_profile_by_id(&self, id: &str) -> Result<Option<Profile>, AppError>;
}

/// Best-effort attendance audit writes.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn open_attendance(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), AppError>;

    /// Close the still-open attendance row for `user_id`.
    async fn close_attendance(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), AppError>;
}
