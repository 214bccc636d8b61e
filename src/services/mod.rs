// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - external collaborators and background workers.

pub mod attendance;
pub mod gotrue;
pub mod identity;
pub mod idle;

pub use attendance::AttendanceRecorder;
pub use gotrue::GoTrueClient;
pub use identity::{AuthEventHub, AuthSubscription, IdentityProvider};
pub use idle::IdleMonitor;
