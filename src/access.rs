//! Role-gated access.
//!
//! The guard is a convenience for picking the right view; the backend's own
//! rules are what actually protect the data.

use std::fmt;

use serde::Serialize;

use crate::user::{Role, UserRecord};

/// Views a principal can be sent to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Route {
    SignIn,
    Admin,
    Dashboard,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::SignIn => "/login",
            Route::Admin => "/admin",
            Route::Dashboard => "/dashboard",
        }
    }

    /// The command that renders this view
    pub fn command(self) -> &'static str {
        match self {
            Route::SignIn => "taskdesk login",
            Route::Admin => "taskdesk task list",
            Route::Dashboard => "taskdesk task mine",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Outcome of a guard check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "access", content = "route", rename_all = "kebab-case")]
pub enum Access {
    Allowed,
    RedirectTo(Route),
}

/// Natural landing view for a role
pub fn landing(role: Role) -> Route {
    match role {
        Role::Admin => Route::Admin,
        Role::User => Route::Dashboard,
    }
}

pub fn authorize(profile: Option<&UserRecord>, required: Option<Role>) -> Access {
    let Some(profile) = profile else {
        return Access::RedirectTo(Route::SignIn);
    };
    match required {
        Some(role) if role != profile.role => Access::RedirectTo(landing(profile.role)),
        _ => Access::Allowed,
    }
}

/// Where the root route sends a visitor
pub fn resolve_home(profile: Option<&UserRecord>) -> Route {
    profile.map_or(Route::SignIn, |profile| landing(profile.role))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(role: Role) -> UserRecord {
        UserRecord {
            id: "u1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            role,
        }
    }

    #[test]
    fn no_profile_goes_to_sign_in() {
        assert_eq!(authorize(None, None), Access::RedirectTo(Route::SignIn));
        assert_eq!(
            authorize(None, Some(Role::Admin)),
            Access::RedirectTo(Route::SignIn)
        );
    }

    #[test]
    fn admin_on_user_view_goes_to_admin() {
        let admin = profile(Role::Admin);
        assert_eq!(
            authorize(Some(&admin), Some(Role::User)),
            Access::RedirectTo(Route::Admin)
        );
    }

    #[test]
    fn user_on_admin_view_goes_to_dashboard() {
        let user = profile(Role::User);
        assert_eq!(
            authorize(Some(&user), Some(Role::Admin)),
            Access::RedirectTo(Route::Dashboard)
        );
    }

    #[test]
    fn matching_or_unrestricted_is_allowed() {
        let user = profile(Role::User);
        assert_eq!(authorize(Some(&user), Some(Role::User)), Access::Allowed);
        assert_eq!(authorize(Some(&user), None), Access::Allowed);
    }

    #[test]
    fn home_resolves_to_landing() {
        assert_eq!(resolve_home(None), Route::SignIn);
        assert_eq!(resolve_home(Some(&profile(Role::Admin))), Route::Admin);
        assert_eq!(resolve_home(Some(&profile(Role::User))), Route::Dashboard);
    }

    #[test]
    fn access_serializes_tagged() {
        let json = serde_json::to_value(Access::RedirectTo(Route::Dashboard)).expect("json");
        assert_eq!(
            json,
            serde_json::json!({"access": "redirect-to", "route": "dashboard"})
        );
    }
}
