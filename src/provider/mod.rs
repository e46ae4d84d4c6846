//! Auth provider boundary.
//!
//! SYSTEM CONTEXT
//! ==============
//! Sessions, users, and profiles are owned by a hosted auth/backend service.
//! The gate only reads them through `AuthProvider`; the guard and the
//! identity bootstrap depend on the trait object, never on the HTTP client.

pub mod cookies;
pub mod events;
#[cfg(test)]
pub mod fake;
pub mod hosted;
pub mod types;

use async_trait::async_trait;
use axum_extra::extract::cookie::CookieJar;

pub use events::{AuthEventBus, DeliveryError, Subscription};
pub use types::{AuthEvent, AuthUser, Credentials, Profile, ProviderError, Role, Session, SessionResolution};

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolve the session carried by request cookies. May produce cookie
    /// mutations (token refresh) that the caller must mirror on its response.
    /// A refresh is also published as `TokenRefreshed` with the new token pair.
    async fn resolve_session(&self, cookies: &CookieJar) -> Result<SessionResolution, ProviderError>;

    /// The user the credentials belong to, or `None` when they are absent or rejected.
    async fn current_user(&self, credentials: &Credentials) -> Result<Option<AuthUser>, ProviderError>;

    /// The profile row for `user_id`, or `None` when it has not been provisioned.
    async fn fetch_profile(&self, credentials: &Credentials, user_id: &str) -> Result<Option<Profile>, ProviderError>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, ProviderError>;

    /// Returns `None` when the provider holds the account for email confirmation.
    async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> Result<Option<Session>, ProviderError>;

    /// Revoke the session and tell subscribers its user signed out.
    async fn sign_out(&self, session: &Session) -> Result<(), ProviderError>;

    async fn request_password_reset(&self, email: &str, redirect_to: &str) -> Result<(), ProviderError>;

    async fn update_password(&self, credentials: &Credentials, password: &str) -> Result<(), ProviderError>;

    /// Open a subscription to auth-state changes. Synchronous so callers can
    /// subscribe before their first resolution and miss nothing.
    fn subscribe(&self) -> Subscription;
}
