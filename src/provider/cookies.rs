//! Session cookie names and builders.
//!
//! The browser holds the provider's token pair in two HttpOnly cookies.
//! Everything that reads or writes them goes through this module.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use super::types::{Credentials, Session};

pub const ACCESS_COOKIE: &str = "portal-access-token";
pub const REFRESH_COOKIE: &str = "portal-refresh-token";

const DEFAULT_ACCESS_TTL_SECS: i64 = 3600;
const REFRESH_TTL_DAYS: i64 = 30;

/// Read the token pair from request cookies. Empty values count as absent.
#[must_use]
pub fn credentials_from_jar(jar: &CookieJar) -> Credentials {
    let read = |name: &str| {
        jar.get(name)
            .map(Cookie::value)
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
    };
    Credentials { access_token: read(ACCESS_COOKIE), refresh_token: read(REFRESH_COOKIE) }
}

fn base_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Cookies that persist a freshly issued session in the browser.
#[must_use]
pub fn session_cookies(session: &Session, secure: bool) -> Vec<Cookie<'static>> {
    let mut cookies = Vec::with_capacity(2);
    if let Some(access) = &session.credentials.access_token {
        let ttl = session
            .expires_in
            .and_then(|secs| i64::try_from(secs).ok())
            .unwrap_or(DEFAULT_ACCESS_TTL_SECS);
        let mut cookie = base_cookie(ACCESS_COOKIE, access.clone(), secure);
        cookie.set_max_age(Duration::seconds(ttl));
        cookies.push(cookie);
    }
    if let Some(refresh) = &session.credentials.refresh_token {
        let mut cookie = base_cookie(REFRESH_COOKIE, refresh.clone(), secure);
        cookie.set_max_age(Duration::days(REFRESH_TTL_DAYS));
        cookies.push(cookie);
    }
    cookies
}

/// Cookies that remove both tokens from the browser.
#[must_use]
pub fn clear_session_cookies(secure: bool) -> Vec<Cookie<'static>> {
    [ACCESS_COOKIE, REFRESH_COOKIE]
        .into_iter()
        .map(|name| {
            let mut cookie = base_cookie(name, String::new(), secure);
            cookie.set_max_age(Duration::ZERO);
            cookie
        })
        .collect()
}

#[cfg(test)]
#[path = "cookies_test.rs"]
mod tests;
