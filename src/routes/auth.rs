//! Auth routes: password sign-in, registration, sign-out, password recovery,
//! and the identity endpoints pages and scripts read from.

use std::convert::Infallible;

use axum::extract::{FromRequestParts, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};

use crate::identity::{IdentityBootstrap, IdentitySnapshot, NavItem, resolve_identity, visible_items};
use crate::provider::cookies::{clear_session_cookies, credentials_from_jar, session_cookies};
use crate::provider::{AuthUser, Credentials, ProviderError, Session};
use crate::state::AppState;

pub const MIN_PASSWORD_LEN: usize = 8;

// =============================================================================
// EXTRACTORS
// =============================================================================

/// Credentials for the current request: the guard's resolved session when
/// there is one, otherwise whatever the cookies carry.
pub struct RequestCredentials(pub Credentials);

impl<S> FromRequestParts<S> for RequestCredentials
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>() {
            return Ok(Self(session.credentials.clone()));
        }
        let jar = CookieJar::from_headers(&parts.headers);
        Ok(Self(credentials_from_jar(&jar)))
    }
}

/// The session the route guard resolved, if any. Never calls the provider.
pub struct MaybeSession(pub Option<Session>);

impl<S> FromRequestParts<S> for MaybeSession
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<Session>().cloned()))
    }
}

/// The session the route guard resolved. Use as a handler parameter to
/// require one.
pub struct AuthSession(pub Session);

impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .map(Self)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Map a provider failure to the status the browser sees.
pub(crate) fn provider_error_to_status(error: &ProviderError) -> StatusCode {
    match error {
        ProviderError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        ProviderError::Response { status, .. } if (400..500).contains(status) => StatusCode::BAD_REQUEST,
        _ => StatusCode::BAD_GATEWAY,
    }
}

#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    Some(normalized)
}

fn password_acceptable(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
}

fn with_cookies(jar: CookieJar, cookies: Vec<Cookie<'static>>) -> CookieJar {
    cookies.into_iter().fold(jar, CookieJar::add)
}

// =============================================================================
// SIGN-IN / REGISTRATION / SIGN-OUT
// =============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

/// `POST /api/auth/login`: password sign-in, sets session cookies.
pub async fn login(State(state): State<AppState>, Json(body): Json<LoginRequest>) -> Result<Response, StatusCode> {
    let email = normalize_email(&body.email).ok_or(StatusCode::BAD_REQUEST)?;
    let session = state
        .provider
        .sign_in_with_password(&email, &body.password)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "password sign-in failed");
            provider_error_to_status(&e)
        })?;

    let jar = with_cookies(CookieJar::new(), session_cookies(&session, state.config.cookie_secure));
    Ok((jar, Json(session.user)).into_response())
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    email: String,
    password: String,
    full_name: String,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    user: Option<AuthUser>,
    confirmation_required: bool,
}

/// `POST /api/auth/register`: create an account. Signs the user in when
/// the provider hands back a session right away.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<Response, StatusCode> {
    let email = normalize_email(&body.email).ok_or(StatusCode::BAD_REQUEST)?;
    let full_name = body.full_name.trim();
    if full_name.is_empty() || !password_acceptable(&body.password) {
        return Err(StatusCode::BAD_REQUEST);
    }

    let session = state
        .provider
        .sign_up(&email, &body.password, full_name)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "registration failed");
            provider_error_to_status(&e)
        })?;

    let Some(session) = session else {
        let body = RegisterResponse { user: None, confirmation_required: true };
        return Ok((StatusCode::CREATED, Json(body)).into_response());
    };
    let jar = with_cookies(CookieJar::new(), session_cookies(&session, state.config.cookie_secure));
    let body = RegisterResponse { user: Some(session.user), confirmation_required: false };
    Ok((StatusCode::CREATED, jar, Json(body)).into_response())
}

/// `POST /api/auth/logout`: revoke at the provider, always clear cookies.
pub async fn logout(State(state): State<AppState>, MaybeSession(session): MaybeSession) -> impl IntoResponse {
    if let Some(session) = session {
        if let Err(e) = state.provider.sign_out(&session).await {
            tracing::warn!(error = %e, user_id = %session.user.id, "provider sign-out failed; clearing cookies anyway");
        }
    }
    let jar = with_cookies(CookieJar::new(), clear_session_cookies(state.config.cookie_secure));
    (jar, StatusCode::NO_CONTENT)
}

// =============================================================================
// PASSWORD RECOVERY
// =============================================================================

#[derive(Deserialize)]
pub struct PasswordResetRequest {
    email: String,
}

/// `POST /api/auth/password/reset`: email a recovery link. The response
/// does not reveal whether the account exists.
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(body): Json<PasswordResetRequest>,
) -> StatusCode {
    let Some(email) = normalize_email(&body.email) else {
        return StatusCode::BAD_REQUEST;
    };
    let redirect_to = state.config.password_reset_redirect();
    if let Err(e) = state.provider.request_password_reset(&email, &redirect_to).await {
        tracing::warn!(error = %e, "password reset request failed");
    }
    StatusCode::ACCEPTED
}

#[derive(Deserialize)]
pub struct PasswordUpdateRequest {
    password: String,
}

/// `POST /api/auth/password/update`: set a new password for the session user.
pub async fn update_password(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Json(body): Json<PasswordUpdateRequest>,
) -> StatusCode {
    if !password_acceptable(&body.password) {
        return StatusCode::BAD_REQUEST;
    }
    match state.provider.update_password(&session.credentials, &body.password).await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(e) => {
            tracing::warn!(error = %e, user_id = %session.user.id, "password update failed");
            provider_error_to_status(&e)
        }
    }
}

// =============================================================================
// IDENTITY
// =============================================================================

#[derive(Serialize)]
pub struct IdentityResponse {
    #[serde(flatten)]
    identity: IdentitySnapshot,
    nav: Vec<NavItem>,
}

impl From<IdentitySnapshot> for IdentityResponse {
    fn from(identity: IdentitySnapshot) -> Self {
        let nav = visible_items(identity.profile());
        Self { identity, nav }
    }
}

/// `GET /api/auth/identity`: resolve once and return the snapshot.
pub async fn identity(
    State(state): State<AppState>,
    RequestCredentials(credentials): RequestCredentials,
) -> Json<IdentityResponse> {
    let resolved = resolve_identity(state.provider.as_ref(), &credentials, state.config.resolve_timeout).await;
    Json(resolved.into_snapshot(1).into())
}

fn identity_event(snapshot: IdentitySnapshot) -> Result<Event, axum::Error> {
    Event::default().event("identity").json_data(IdentityResponse::from(snapshot))
}

/// `GET /api/auth/identity/stream`: one `identity` event per snapshot.
///
/// The bootstrap follows the guard's session for this connection and lives
/// exactly as long as it: when the client goes away the stream is dropped,
/// which tears the bootstrap down and cancels its provider subscription.
pub async fn identity_stream(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let bootstrap = IdentityBootstrap::spawn(state.provider.clone(), session, state.config.resolve_timeout);

    let events = stream::unfold((bootstrap, true), |(mut bootstrap, first)| async move {
        let snapshot = if first { bootstrap.latest() } else { bootstrap.changed().await? };
        Some((identity_event(snapshot), (bootstrap, false)))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
