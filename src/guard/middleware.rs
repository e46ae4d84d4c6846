//! Route guard middleware.
//!
//! ERROR HANDLING
//! ==============
//! Session resolution fails closed: a provider error or a timeout is treated
//! exactly like "no session". The guard never turns a provider failure into
//! a 5xx; the worst case is an extra trip through the login page.

use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::http::header::SET_COOKIE;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use tracing::{debug, warn};

use super::table::{RouteClass, RouteTable, is_excluded};
use crate::provider::{AuthProvider, SessionResolution};
use crate::state::AppState;

/// What the guard does with one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Redirect(&'static str),
    Forward,
}

/// Apply the access rules, in order: root, protected, auth-only, everything else.
#[must_use]
pub fn decide(table: &RouteTable, path: &str, session_present: bool) -> GuardDecision {
    if table.is_root(path) {
        let target = if session_present { table.dashboard } else { table.login };
        return GuardDecision::Redirect(target);
    }
    match table.classify(path) {
        RouteClass::Protected if !session_present => GuardDecision::Redirect(table.login),
        RouteClass::AuthOnly if session_present => GuardDecision::Redirect(table.dashboard),
        _ => GuardDecision::Forward,
    }
}

/// Resolve the request's session with a bounded wait, failing closed.
pub async fn resolve_session(provider: &dyn AuthProvider, cookies: &CookieJar, limit: Duration) -> SessionResolution {
    match tokio::time::timeout(limit, provider.resolve_session(cookies)).await {
        Ok(Ok(resolution)) => resolution,
        Ok(Err(e)) => {
            warn!(error = %e, "session resolution failed; treating request as signed out");
            SessionResolution::absent()
        }
        Err(_) => {
            warn!(timeout_ms = limit.as_millis(), "session resolution timed out; treating request as signed out");
            SessionResolution::absent()
        }
    }
}

/// Append provider cookie mutations to an outgoing response. A cookie the
/// handler already set wins over the provider's update for the same name.
pub fn mirror_cookies(response: &mut Response, cookies: &[Cookie<'static>]) {
    let handler_set: Vec<String> = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| Cookie::parse(value).ok().map(|c| c.name().to_owned()))
        .collect();

    for cookie in cookies {
        if handler_set.iter().any(|name| name == cookie.name()) {
            debug!(cookie = cookie.name(), "handler already set cookie; skipping provider update");
            continue;
        }
        match HeaderValue::from_str(&cookie.encoded().to_string()) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => warn!(error = %e, cookie = cookie.name(), "dropping unencodable cookie update"),
        }
    }
}

/// Axum middleware enforcing the route table on every non-excluded request.
///
/// Forwarded requests carry the resolved `Session` as a request extension so
/// handlers downstream never re-derive it from cookies.
pub async fn route_guard(State(state): State<AppState>, jar: CookieJar, mut request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    if is_excluded(&path) {
        return next.run(request).await;
    }

    let resolution = resolve_session(state.provider.as_ref(), &jar, state.config.resolve_timeout).await;
    let decision = decide(&state.routes, &path, resolution.session_present());

    let mut response = match decision {
        GuardDecision::Redirect(target) => {
            debug!(%path, location = target, session = resolution.session_present(), "route guard redirect");
            Redirect::temporary(target).into_response()
        }
        GuardDecision::Forward => {
            if let Some(session) = resolution.session.clone() {
                request.extensions_mut().insert(session);
            }
            next.run(request).await
        }
    };

    mirror_cookies(&mut response, &resolution.cookie_updates);
    response
}

#[cfg(test)]
#[path = "middleware_test.rs"]
mod tests;
