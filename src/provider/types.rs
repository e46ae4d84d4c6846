//! Provider-neutral auth types and errors.

use std::fmt;

use axum_extra::extract::cookie::Cookie;
use serde::{Deserialize, Serialize};

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by calls to the hosted auth provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The HTTP request could not be sent or timed out.
    #[error("provider request failed: {0}")]
    Request(String),

    /// The provider answered with a non-success status.
    #[error("provider response error: status {status}")]
    Response { status: u16, body: String },

    /// The provider response body could not be deserialized.
    #[error("provider response parse failed: {0}")]
    Parse(String),

    /// Email/password rejected at sign-in.
    #[error("invalid login credentials")]
    InvalidCredentials,

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

// =============================================================================
// CREDENTIALS
// =============================================================================

/// Session tokens carried by the browser. Either may be absent.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Credentials {
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self { access_token: Some(access_token.into()), refresh_token: Some(refresh_token.into()) }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |token: &Option<String>| if token.is_some() { "<redacted>" } else { "<none>" };
        f.debug_struct("Credentials")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .finish()
    }
}

// =============================================================================
// USER + PROFILE
// =============================================================================

/// Minimal user record returned by the provider's user endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Staff role stored on the profile row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Doctor,
    Support,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Doctor => "doctor",
            Self::Support => "support",
        }
    }
}

/// Row from the profiles table, keyed by the auth user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

// =============================================================================
// SESSION
// =============================================================================

/// An active provider session: the user plus the tokens that prove it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: AuthUser,
    pub credentials: Credentials,
    /// Access token lifetime in seconds, when the provider reported one.
    pub expires_in: Option<u64>,
}

/// Outcome of resolving the session for one request.
#[derive(Debug, Default)]
pub struct SessionResolution {
    pub session: Option<Session>,
    /// Set-cookie instructions produced while resolving (e.g. token refresh).
    /// Must be mirrored onto the outgoing response.
    pub cookie_updates: Vec<Cookie<'static>>,
}

impl SessionResolution {
    #[must_use]
    pub fn absent() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn present(session: Session) -> Self {
        Self { session: Some(session), cookie_updates: Vec::new() }
    }

    #[must_use]
    pub fn with_cookie_updates(mut self, cookies: Vec<Cookie<'static>>) -> Self {
        self.cookie_updates = cookies;
        self
    }

    #[must_use]
    pub fn session_present(&self) -> bool {
        self.session.is_some()
    }
}

// =============================================================================
// AUTH EVENTS
// =============================================================================

/// Auth-state change pushed by the provider. Every event names the user it
/// concerns; a refresh also carries the rotated token pair, which is never
/// serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuthEvent {
    SignedIn { user_id: String },
    SignedOut { user_id: String },
    TokenRefreshed {
        user_id: String,
        #[serde(skip)]
        credentials: Credentials,
    },
    UserUpdated { user_id: String },
}

impl AuthEvent {
    #[must_use]
    pub fn session_present(&self) -> bool {
        !matches!(self, Self::SignedOut { .. })
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        match self {
            Self::SignedIn { user_id }
            | Self::SignedOut { user_id }
            | Self::TokenRefreshed { user_id, .. }
            | Self::UserUpdated { user_id } => user_id,
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SignedIn { .. } => "signed_in",
            Self::SignedOut { .. } => "signed_out",
            Self::TokenRefreshed { .. } => "token_refreshed",
            Self::UserUpdated { .. } => "user_updated",
        }
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
