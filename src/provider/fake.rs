//! In-memory `AuthProvider` double for tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use tokio::sync::broadcast;

use super::cookies::credentials_from_jar;
use super::events::Subscription;
use super::types::{AuthEvent, AuthUser, Credentials, Profile, ProviderError, Role, Session, SessionResolution};
use super::AuthProvider;

/// Access tokens issued with `issue_token` belong to their own user; any
/// other non-empty, unrevoked token belongs to the account set with `set_user`.
#[derive(Default)]
struct FakeState {
    user: Option<AuthUser>,
    tokens: HashMap<String, AuthUser>,
    revoked: HashSet<String>,
    profiles: HashMap<String, Profile>,
    fail_session: bool,
    fail_identity: bool,
    delay: Option<Duration>,
    identity_delay: Option<Duration>,
    refreshed_cookies: Vec<Cookie<'static>>,
    password: Option<String>,
}

pub struct FakeProvider {
    state: Mutex<FakeState>,
    events: broadcast::Sender<AuthEvent>,
    pub resolve_calls: AtomicUsize,
    pub current_user_calls: AtomicUsize,
    pub profile_calls: AtomicUsize,
    pub subscriptions_opened: AtomicUsize,
    pub subscriptions_cancelled: Arc<AtomicUsize>,
}

#[must_use]
pub fn user(id: &str) -> AuthUser {
    AuthUser { id: id.into(), email: Some(format!("{id}@clinic.test")) }
}

#[must_use]
pub fn profile(id: &str, role: Role) -> Profile {
    Profile {
        id: id.into(),
        email: format!("{id}@clinic.test"),
        full_name: format!("Staff {id}"),
        role,
        avatar_url: None,
        created_at: "2024-01-01T00:00:00Z".into(),
        updated_at: "2024-01-01T00:00:00Z".into(),
    }
}

impl FakeProvider {
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            state: Mutex::new(FakeState::default()),
            events,
            resolve_calls: AtomicUsize::new(0),
            current_user_calls: AtomicUsize::new(0),
            profile_calls: AtomicUsize::new(0),
            subscriptions_opened: AtomicUsize::new(0),
            subscriptions_cancelled: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A provider whose user `id` is signed in with a provisioned profile.
    #[must_use]
    pub fn signed_in(id: &str, role: Role) -> Self {
        let fake = Self::new();
        fake.set_user(Some(user(id)));
        fake.set_profile(Some(profile(id, role)));
        fake
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut FakeState) -> T) -> T {
        let mut state = self.state.lock().expect("fake provider mutex should lock");
        f(&mut state)
    }

    pub fn set_user(&self, user: Option<AuthUser>) {
        self.with_state(|s| s.user = user);
    }

    /// Store `profile` under its user id; `None` removes every profile.
    pub fn set_profile(&self, profile: Option<Profile>) {
        self.with_state(|s| match profile {
            Some(profile) => {
                s.profiles.insert(profile.id.clone(), profile);
            }
            None => s.profiles.clear(),
        });
    }

    /// Make `access_token` resolve to `user`.
    pub fn issue_token(&self, access_token: &str, user: AuthUser) {
        self.with_state(|s| {
            s.revoked.remove(access_token);
            s.tokens.insert(access_token.to_owned(), user);
        });
    }

    /// Make `access_token` resolve to nobody from now on.
    pub fn revoke_token(&self, access_token: &str) {
        self.with_state(|s| {
            s.tokens.remove(access_token);
            s.revoked.insert(access_token.to_owned());
        });
    }

    pub fn fail_session(&self, fail: bool) {
        self.with_state(|s| s.fail_session = fail);
    }

    pub fn fail_identity(&self, fail: bool) {
        self.with_state(|s| s.fail_identity = fail);
    }

    /// Delay every session and identity lookup.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.with_state(|s| s.delay = delay);
    }

    /// Delay identity lookups only, leaving the guard's session lookup fast.
    pub fn set_identity_delay(&self, delay: Option<Duration>) {
        self.with_state(|s| s.identity_delay = delay);
    }

    pub fn set_refreshed_cookies(&self, cookies: Vec<Cookie<'static>>) {
        self.with_state(|s| s.refreshed_cookies = cookies);
    }

    pub fn set_password(&self, password: &str) {
        self.with_state(|s| s.password = Some(password.to_owned()));
    }

    /// Push an auth event to every open subscription.
    pub fn emit(&self, event: AuthEvent) -> usize {
        self.events.send(event).unwrap_or(0)
    }

    #[must_use]
    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn user_for(&self, credentials: &Credentials) -> Option<AuthUser> {
        let access = credentials.access_token.as_deref()?;
        self.with_state(|s| {
            if s.revoked.contains(access) {
                return None;
            }
            s.tokens.get(access).cloned().or_else(|| s.user.clone())
        })
    }

    async fn pause(delay: Option<Duration>) {
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthProvider for FakeProvider {
    async fn resolve_session(&self, cookies: &CookieJar) -> Result<SessionResolution, ProviderError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        Self::pause(self.with_state(|s| s.delay)).await;
        let credentials = credentials_from_jar(cookies);
        let (fail, refreshed) = self.with_state(|s| (s.fail_session, s.refreshed_cookies.clone()));
        if fail {
            return Err(ProviderError::Request("connection refused".into()));
        }
        match self.user_for(&credentials) {
            Some(user) => {
                Ok(SessionResolution::present(Session { user, credentials, expires_in: None })
                    .with_cookie_updates(refreshed))
            }
            _ => Ok(SessionResolution::absent()),
        }
    }

    async fn current_user(&self, credentials: &Credentials) -> Result<Option<AuthUser>, ProviderError> {
        self.current_user_calls.fetch_add(1, Ordering::SeqCst);
        Self::pause(self.with_state(|s| s.identity_delay.or(s.delay))).await;
        if self.with_state(|s| s.fail_identity) {
            return Err(ProviderError::Response { status: 500, body: "boom".into() });
        }
        Ok(self.user_for(credentials))
    }

    async fn fetch_profile(&self, _credentials: &Credentials, user_id: &str) -> Result<Option<Profile>, ProviderError> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.with_state(|s| s.profiles.get(user_id).cloned()))
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, ProviderError> {
        let (expected, user) = self.with_state(|s| (s.password.clone(), s.user.clone()));
        match (expected, user) {
            (Some(expected), Some(user)) if expected == password && user.email.as_deref() == Some(email) => {
                let _ = self.emit(AuthEvent::SignedIn { user_id: user.id.clone() });
                Ok(Session { user, credentials: Credentials::new("fresh-access", "fresh-refresh"), expires_in: Some(3600) })
            }
            _ => Err(ProviderError::InvalidCredentials),
        }
    }

    async fn sign_up(&self, email: &str, _password: &str, _full_name: &str) -> Result<Option<Session>, ProviderError> {
        let id = email.split('@').next().unwrap_or("new").to_owned();
        Ok(Some(Session {
            user: AuthUser { id, email: Some(email.to_owned()) },
            credentials: Credentials::new("signup-access", "signup-refresh"),
            expires_in: Some(3600),
        }))
    }

    async fn sign_out(&self, session: &Session) -> Result<(), ProviderError> {
        if let Some(access) = session.credentials.access_token.as_deref() {
            self.revoke_token(access);
        }
        let _ = self.emit(AuthEvent::SignedOut { user_id: session.user.id.clone() });
        Ok(())
    }

    async fn request_password_reset(&self, _email: &str, _redirect_to: &str) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn update_password(&self, credentials: &Credentials, password: &str) -> Result<(), ProviderError> {
        if credentials.access_token.is_none() {
            return Err(ProviderError::InvalidCredentials);
        }
        self.set_password(password);
        Ok(())
    }

    fn subscribe(&self) -> Subscription {
        self.subscriptions_opened.fetch_add(1, Ordering::SeqCst);
        let cancelled = Arc::clone(&self.subscriptions_cancelled);
        Subscription::new(self.events.subscribe(), move || {
            cancelled.fetch_add(1, Ordering::SeqCst);
        })
    }
}
