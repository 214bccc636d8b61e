// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (view guard, activity tracking, security headers).

pub mod access;
pub mod security;

pub use access::{require_view, track_activity};
