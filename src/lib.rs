// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Lead console: session and authorization core
//!
//! This crate establishes who the current console operator is, keeps that
//! identity consistent across identity-provider events, gates role-restricted
//! views and makes backend calls resilient to expired credentials.

pub mod access;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;
pub mod time_utils;

use access::RedirectSignal;
use config::Config;
use services::IdleMonitor;
use session::{Authenticator, ResilientExecutor, SessionStore};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<SessionStore>,
    pub authenticator: Authenticator,
    pub executor: ResilientExecutor,
    pub redirects: Arc<RedirectSignal>,
    pub idle: Arc<IdleMonitor>,
}
