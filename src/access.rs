// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Role router and view guard.
//!
//! Pure decision tables: role → landing route, view → allowed roles, and
//! the entry/guard decisions derived from a session snapshot. Nothing in
//! here holds state except [`RedirectSignal`], the server's navigation sink.

use crate::models::Role;
use crate::session::SessionSnapshot;
use std::sync::Mutex;

/// Login entry point.
pub const LOGIN_ROUTE: &str = "/login";

/// Landing route for a role string; unknown roles go to login.
pub fn resolve_landing_route(role: &str) -> &'static str {
    role.parse::<Role>()
        .map(landing_route)
        .unwrap_or(LOGIN_ROUTE)
}

/// Landing route for a known role.
pub fn landing_route(role: Role) -> &'static str {
    match role {
        Role::Admin => "/admin",
        Role::Sales => "/sales",
        Role::Intern => "/intern",
    }
}

pub fn is_role_allowed(role: Role, allowed_roles: &[Role]) -> bool {
    allowed_roles.contains(&role)
}

/// Role-restricted console views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    AdminDashboard,
    SalesDashboard,
    InternDashboard,
    Leads,
    Documents,
    Reviews,
    Users,
    Attendance,
}

impl View {
    pub const ALL: [View; 8] = [
        View::AdminDashboard,
        View::SalesDashboard,
        View::InternDashboard,
        View::Leads,
        View::Documents,
        View::Reviews,
        View::Users,
        View::Attendance,
    ];

    pub fn path(self) -> &'static str {
        match self {
            View::AdminDashboard => "/admin",
            View::SalesDashboard => "/sales",
            View::InternDashboard => "/intern",
            View::Leads => "/leads",
            View::Documents => "/documents",
            View::Reviews => "/reviews",
            View::Users => "/admin/users",
            View::Attendance => "/admin/attendance",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            View::AdminDashboard => "admin-dashboard",
            View::SalesDashboard => "sales-dashboard",
            View::InternDashboard => "intern-dashboard",
            View::Leads => "leads",
            View::Documents => "documents",
            View::Reviews => "reviews",
            View::Users => "users",
            View::Attendance => "attendance",
        }
    }

    pub fn allowed_roles(self) -> &'static [Role] {
        match self {
            View::AdminDashboard | View::Users | View::Attendance => &[Role::Admin],
            View::SalesDashboard => &[Role::Sales],
            View::InternDashboard => &[Role::Intern],
            View::Leads => &[Role::Admin, Role::Sales, Role::Intern],
            View::Documents | View::Reviews => &[Role::Admin, Role::Sales],
        }
    }

    pub fn from_path(path: &str) -> Option<View> {
        let path = path.trim_end_matches('/');
        View::ALL.into_iter().find(|view| view.path() == path)
    }
}

/// Every view `role` may open.
pub fn granted_views(role: Role) -> Vec<View> {
    View::ALL
        .into_iter()
        .filter(|view| is_role_allowed(role, view.allowed_roles()))
        .collect()
}

/// Router-visible access state, fixed once the store is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessState {
    Unknown,
    Unauthenticated,
    Authenticated(Role),
}

impl AccessState {
    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Self {
        if !snapshot.is_ready() {
            return AccessState::Unknown;
        }
        match (&snapshot.identity, &snapshot.profile) {
            (Some(_), Some(profile)) => AccessState::Authenticated(profile.role),
            _ => AccessState::Unauthenticated,
        }
    }
}

/// What the root entry point should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryDecision {
    /// Still initializing: show a neutral loading state.
    Loading,
    Redirect(&'static str),
}

pub fn entry_redirect(snapshot: &SessionSnapshot) -> EntryDecision {
    match AccessState::from_snapshot(snapshot) {
        AccessState::Unknown => EntryDecision::Loading,
        AccessState::Unauthenticated => EntryDecision::Redirect(LOGIN_ROUTE),
        AccessState::Authenticated(role) => EntryDecision::Redirect(landing_route(role)),
    }
}

/// What a protected view should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Still initializing: render nothing protected.
    Loading,
    Render,
    RedirectToLogin,
}

pub fn guard_view(snapshot: &SessionSnapshot, allowed_roles: &[Role]) -> GuardDecision {
    match AccessState::from_snapshot(snapshot) {
        AccessState::Unknown => GuardDecision::Loading,
        AccessState::Authenticated(role) if is_role_allowed(role, allowed_roles) => {
            GuardDecision::Render
        }
        _ => GuardDecision::RedirectToLogin,
    }
}

/// Sink for forced navigation (e.g. after an unrecoverable session expiry).
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &'static str);
}

/// Navigator that parks the forced route until the front end picks it up.
#[derive(Debug, Default)]
pub struct RedirectSignal {
    pending: Mutex<Option<&'static str>>,
}

impl RedirectSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pending forced route, if any.
    pub fn pending(&self) -> Option<&'static str> {
        self.pending.lock().map(|guard| *guard).unwrap_or(None)
    }

    /// Forget the pending route (after a fresh sign-in).
    pub fn reset(&self) {
        if let Ok(mut guard) = self.pending.lock() {
            *guard = None;
        }
    }
}

impl Navigator for RedirectSignal {
    fn navigate(&self, route: &'static str) {
        tracing::info!(route, "Forcing navigation");
        if let Ok(mut guard) = self.pending.lock() {
            *guard = Some(route);
        }
    }
}
