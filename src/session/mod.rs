// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session core: store, authenticator and resilient call wrapper.

pub mod authenticator;
pub mod resilient;
pub mod store;

pub use authenticator::Authenticator;
pub use resilient::{CallOptions, ResilientExecutor};
pub use store::{Readiness, SessionSnapshot, SessionStore};
