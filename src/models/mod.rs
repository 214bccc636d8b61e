// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod attendance;
pub mod identity;
pub mod profile;

pub use attendance::{AttendanceClose, AttendanceRecord};
pub use identity::{AuthEvent, AuthEventKind, Identity};
pub use profile::{Profile, ProfileStatus, Role, UnknownRole};
