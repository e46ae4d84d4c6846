//! Route classification table.
//!
//! The partition of portal paths into protected, auth-only, and neutral is
//! fixed configuration. Nothing derives it at runtime.

/// Access class of a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Requires an active session.
    Protected,
    /// Only meaningful without a session (login, registration, reset request).
    AuthOnly,
    Neutral,
}

pub const ROOT_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/dashboard";

pub const PROTECTED_PREFIXES: &[&str] = &[
    "/dashboard",
    "/patients",
    "/appointments",
    "/messages",
    "/notes",
    "/availability",
    "/settings",
    "/profile",
];

pub const AUTH_ONLY_PATHS: &[&str] = &["/login", "/register", "/forgot-password"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    pub root: &'static str,
    pub login: &'static str,
    pub dashboard: &'static str,
    pub protected: &'static [&'static str],
    pub auth_only: &'static [&'static str],
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RouteTableError {
    #[error("path {0} is both protected and auth-only")]
    Overlap(&'static str),
    #[error("login path {0} must be auth-only")]
    LoginNotAuthOnly(&'static str),
    #[error("dashboard path {0} must be protected")]
    DashboardNotProtected(&'static str),
}

impl RouteTable {
    /// The clinic portal's route table.
    #[must_use]
    pub const fn portal() -> Self {
        Self {
            root: ROOT_PATH,
            login: LOGIN_PATH,
            dashboard: DASHBOARD_PATH,
            protected: PROTECTED_PREFIXES,
            auth_only: AUTH_ONLY_PATHS,
        }
    }

    /// Check that no path lands in two partitions and that the redirect
    /// targets are classified the way the guard relies on.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule.
    pub fn validate(&self) -> Result<(), RouteTableError> {
        for path in self.auth_only {
            if self.protected.iter().any(|prefix| matches_prefix(path, prefix)) {
                return Err(RouteTableError::Overlap(*path));
            }
        }
        if self.classify(self.login) != RouteClass::AuthOnly {
            return Err(RouteTableError::LoginNotAuthOnly(self.login));
        }
        if self.classify(self.dashboard) != RouteClass::Protected {
            return Err(RouteTableError::DashboardNotProtected(self.dashboard));
        }
        Ok(())
    }

    #[must_use]
    pub fn classify(&self, path: &str) -> RouteClass {
        if self.protected.iter().any(|prefix| matches_prefix(path, prefix)) {
            RouteClass::Protected
        } else if self.auth_only.iter().any(|exact| *exact == path) {
            RouteClass::AuthOnly
        } else {
            RouteClass::Neutral
        }
    }

    #[must_use]
    pub fn is_root(&self, path: &str) -> bool {
        path == self.root
    }
}

/// Exact match, or `prefix` followed by a `/` segment boundary.
fn matches_prefix(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

// =============================================================================
// GUARD EXCLUSIONS
// =============================================================================

/// Declarative path matcher for requests the guard never sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathPattern {
    Exact(&'static str),
    Prefix(&'static str),
    Suffix(&'static str),
}

impl PathPattern {
    #[must_use]
    pub fn matches(self, path: &str) -> bool {
        match self {
            Self::Exact(p) => path == p,
            Self::Prefix(p) => path.starts_with(p),
            Self::Suffix(p) => path.ends_with(p),
        }
    }
}

/// Static assets, the image endpoint, the favicon, and any `.png`.
pub const GUARD_EXCLUSIONS: &[PathPattern] = &[
    PathPattern::Prefix("/static/"),
    PathPattern::Prefix("/_image"),
    PathPattern::Exact("/favicon.ico"),
    PathPattern::Suffix(".png"),
];

#[must_use]
pub fn is_excluded(path: &str) -> bool {
    GUARD_EXCLUSIONS.iter().any(|pattern| pattern.matches(path))
}

#[cfg(test)]
#[path = "table_test.rs"]
mod tests;
