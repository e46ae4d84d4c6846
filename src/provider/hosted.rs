//! Hosted auth provider client (GoTrue-compatible auth + PostgREST profiles).
//!
//! Thin HTTP wrapper. Wire parsing lives in free functions so it can be
//! tested without a network.

use async_trait::async_trait;
use axum_extra::extract::cookie::CookieJar;
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use super::cookies::{credentials_from_jar, session_cookies};
use super::events::{AuthEventBus, Subscription};
use super::types::{AuthEvent, AuthUser, Credentials, Profile, ProviderError, Session, SessionResolution};
use super::AuthProvider;
use crate::config::ProviderConfig;

// =============================================================================
// CLIENT
// =============================================================================

pub struct HostedAuthClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    profile_table: String,
    /// Whether refreshed session cookies get the `Secure` attribute.
    cookie_secure: bool,
    events: AuthEventBus,
}

impl HostedAuthClient {
    /// Build a client from typed provider config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &ProviderConfig, cookie_secure: bool) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ProviderError::HttpClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            anon_key: config.anon_key.clone(),
            profile_table: config.profile_table.clone(),
            cookie_secure,
            events: AuthEventBus::new(),
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    fn with_keys(&self, request: RequestBuilder, access_token: Option<&str>) -> RequestBuilder {
        let bearer = access_token.unwrap_or(&self.anon_key);
        request
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {bearer}"))
    }

    async fn send(request: RequestBuilder) -> Result<(StatusCode, String), ProviderError> {
        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;
        Ok((status, body))
    }

    /// `GET /auth/v1/user`. A rejected token is "no user", not an error.
    async fn fetch_user(&self, access_token: &str) -> Result<Option<AuthUser>, ProviderError> {
        let request = self.with_keys(self.http.get(self.auth_url("user")), Some(access_token));
        let (status, body) = Self::send(request).await?;
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ProviderError::Response { status: status.as_u16(), body });
        }
        parse_user(&body).map(Some)
    }

    /// `POST /auth/v1/token?grant_type=...`.
    async fn grant(&self, grant_type: &str, body: serde_json::Value) -> Result<(StatusCode, String), ProviderError> {
        let request = self
            .with_keys(self.http.post(self.auth_url("token")), None)
            .query(&[("grant_type", grant_type)])
            .json(&body);
        Self::send(request).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Option<Session>, ProviderError> {
        let (status, body) = self
            .grant("refresh_token", serde_json::json!({ "refresh_token": refresh_token }))
            .await?;
        if status.is_client_error() {
            // Revoked or already-rotated refresh token.
            debug!(status = status.as_u16(), "refresh token rejected");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ProviderError::Response { status: status.as_u16(), body });
        }
        parse_session(&body).map(Some)
    }
}

#[async_trait]
impl AuthProvider for HostedAuthClient {
    async fn resolve_session(&self, cookies: &CookieJar) -> Result<SessionResolution, ProviderError> {
        let credentials = credentials_from_jar(cookies);

        if let Some(access) = credentials.access_token.as_deref() {
            if let Some(user) = self.fetch_user(access).await? {
                return Ok(SessionResolution::present(Session { user, credentials, expires_in: None }));
            }
        }

        let Some(refresh) = credentials.refresh_token.as_deref() else {
            return Ok(SessionResolution::absent());
        };
        let Some(session) = self.refresh(refresh).await? else {
            return Ok(SessionResolution::absent());
        };

        self.events.publish(AuthEvent::TokenRefreshed {
            user_id: session.user.id.clone(),
            credentials: session.credentials.clone(),
        });
        let cookies = session_cookies(&session, self.cookie_secure);
        Ok(SessionResolution::present(session).with_cookie_updates(cookies))
    }

    async fn current_user(&self, credentials: &Credentials) -> Result<Option<AuthUser>, ProviderError> {
        match credentials.access_token.as_deref() {
            Some(access) => self.fetch_user(access).await,
            None => Ok(None),
        }
    }

    async fn fetch_profile(&self, credentials: &Credentials, user_id: &str) -> Result<Option<Profile>, ProviderError> {
        let url = format!("{}/rest/v1/{}", self.base_url, self.profile_table);
        let id_filter = format!("eq.{user_id}");
        let request = self
            .with_keys(self.http.get(url), credentials.access_token.as_deref())
            .query(&[("id", id_filter.as_str()), ("select", "*")]);
        let (status, body) = Self::send(request).await?;
        if !status.is_success() {
            return Err(ProviderError::Response { status: status.as_u16(), body });
        }
        parse_profile_rows(&body)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, ProviderError> {
        let (status, body) = self
            .grant("password", serde_json::json!({ "email": email, "password": password }))
            .await?;
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            return Err(ProviderError::InvalidCredentials);
        }
        if !status.is_success() {
            return Err(ProviderError::Response { status: status.as_u16(), body });
        }
        let session = parse_session(&body)?;
        self.events.publish(AuthEvent::SignedIn { user_id: session.user.id.clone() });
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> Result<Option<Session>, ProviderError> {
        let request = self.with_keys(self.http.post(self.auth_url("signup")), None).json(&serde_json::json!({
            "email": email,
            "password": password,
            "data": { "full_name": full_name },
        }));
        let (status, body) = Self::send(request).await?;
        if !status.is_success() {
            return Err(ProviderError::Response { status: status.as_u16(), body });
        }
        let session = parse_signup(&body)?;
        if let Some(session) = &session {
            self.events.publish(AuthEvent::SignedIn { user_id: session.user.id.clone() });
        }
        Ok(session)
    }

    async fn sign_out(&self, session: &Session) -> Result<(), ProviderError> {
        if let Some(access) = session.credentials.access_token.as_deref() {
            let request = self.with_keys(self.http.post(self.auth_url("logout")), Some(access));
            let (status, body) = Self::send(request).await?;
            // An already-expired token is as good as signed out.
            if !status.is_success() && status != StatusCode::UNAUTHORIZED {
                warn!(status = status.as_u16(), "provider logout failed");
                return Err(ProviderError::Response { status: status.as_u16(), body });
            }
        }
        self.events.publish(AuthEvent::SignedOut { user_id: session.user.id.clone() });
        Ok(())
    }

    async fn request_password_reset(&self, email: &str, redirect_to: &str) -> Result<(), ProviderError> {
        let request = self
            .with_keys(self.http.post(self.auth_url("recover")), None)
            .query(&[("redirect_to", redirect_to)])
            .json(&serde_json::json!({ "email": email }));
        let (status, body) = Self::send(request).await?;
        if !status.is_success() {
            return Err(ProviderError::Response { status: status.as_u16(), body });
        }
        Ok(())
    }

    async fn update_password(&self, credentials: &Credentials, password: &str) -> Result<(), ProviderError> {
        let Some(access) = credentials.access_token.as_deref() else {
            return Err(ProviderError::InvalidCredentials);
        };
        let request = self
            .with_keys(self.http.put(self.auth_url("user")), Some(access))
            .json(&serde_json::json!({ "password": password }));
        let (status, body) = Self::send(request).await?;
        if status == StatusCode::UNAUTHORIZED {
            return Err(ProviderError::InvalidCredentials);
        }
        if !status.is_success() {
            return Err(ProviderError::Response { status: status.as_u16(), body });
        }
        let user = parse_user(&body)?;
        self.events.publish(AuthEvent::UserUpdated { user_id: user.id });
        Ok(())
    }

    fn subscribe(&self) -> Subscription {
        self.events.subscribe()
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
    user: AuthUser,
}

/// Sign-up answers with a full token response when auto-confirm is on, or a
/// bare user when email confirmation is pending.
#[derive(Deserialize)]
#[serde(untagged)]
enum SignupResponse {
    Session(TokenResponse),
    PendingConfirmation(AuthUser),
}

// =============================================================================
// PARSING
// =============================================================================

fn parse_user(json: &str) -> Result<AuthUser, ProviderError> {
    serde_json::from_str(json).map_err(|e| ProviderError::Parse(e.to_string()))
}

fn session_from_tokens(tokens: TokenResponse) -> Session {
    Session {
        user: tokens.user,
        credentials: Credentials::new(tokens.access_token, tokens.refresh_token),
        expires_in: tokens.expires_in,
    }
}

fn parse_session(json: &str) -> Result<Session, ProviderError> {
    let tokens: TokenResponse = serde_json::from_str(json).map_err(|e| ProviderError::Parse(e.to_string()))?;
    Ok(session_from_tokens(tokens))
}

fn parse_signup(json: &str) -> Result<Option<Session>, ProviderError> {
    let response: SignupResponse = serde_json::from_str(json).map_err(|e| ProviderError::Parse(e.to_string()))?;
    Ok(match response {
        SignupResponse::Session(tokens) => Some(session_from_tokens(tokens)),
        SignupResponse::PendingConfirmation(_) => None,
    })
}

/// PostgREST returns an array; an empty one means the row does not exist.
fn parse_profile_rows(json: &str) -> Result<Option<Profile>, ProviderError> {
    let rows: Vec<Profile> = serde_json::from_str(json).map_err(|e| ProviderError::Parse(e.to_string()))?;
    Ok(rows.into_iter().next())
}

#[cfg(test)]
#[path = "hosted_test.rs"]
mod tests;
