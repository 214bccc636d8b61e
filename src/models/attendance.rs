//! Attendance audit rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row in the `attendance` table, opened at sign-in and closed at sign-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub user_id: String,
    pub check_in: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_out: Option<DateTime<Utc>>,
}

/// Patch body closing an open attendance row.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceClose {
    pub check_out: DateTime<Utc>,
}
