//! Portal page shells.
//!
//! Each page resolves identity once for the request, runs the layout gate,
//! and either redirects or renders a minimal HTML shell with the user's name
//! and their role's navigation. The CRUD screens themselves are not served
//! from here.

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum_extra::extract::cookie::CookieJar;

use super::auth::MaybeSession;
use crate::identity::{IdentitySnapshot, IdentityState, LayoutDecision, evaluate, resolve_identity, visible_items};
use crate::provider::Role;
use crate::provider::cookies::clear_session_cookies;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub path: &'static str,
    pub title: &'static str,
    /// Also serves `{path}/...` (detail pages such as `/patients/123`).
    pub nested: bool,
}

pub const PAGES: &[Page] = &[
    Page { path: "/dashboard", title: "Dashboard", nested: false },
    Page { path: "/patients", title: "Patients", nested: true },
    Page { path: "/appointments", title: "Appointments", nested: true },
    Page { path: "/messages", title: "Messages", nested: true },
    Page { path: "/notes", title: "Clinical Notes", nested: true },
    Page { path: "/availability", title: "Availability", nested: false },
    Page { path: "/settings", title: "Settings", nested: false },
    Page { path: "/profile", title: "Profile", nested: false },
    Page { path: "/login", title: "Sign in", nested: false },
    Page { path: "/register", title: "Create account", nested: false },
    Page { path: "/forgot-password", title: "Forgot password", nested: false },
    Page { path: "/reset-password", title: "Choose a new password", nested: false },
];

#[must_use]
pub fn find_page(path: &str) -> Option<&'static Page> {
    PAGES.iter().find(|page| {
        path == page.path
            || (page.nested && path.strip_prefix(page.path).is_some_and(|rest| rest.starts_with('/')))
    })
}

/// One `GET` route per page, plus a wildcard for nested pages.
pub fn routes() -> Router<AppState> {
    PAGES.iter().fold(Router::new(), |router, page| {
        let router = router.route(page.path, get(render));
        if page.nested {
            router.route(&format!("{}/{{*rest}}", page.path), get(render))
        } else {
            router
        }
    })
}

/// Page shell handler. Identity comes from the session the guard resolved;
/// without one the visitor is signed out and the provider is not asked again.
pub async fn render(State(state): State<AppState>, MaybeSession(session): MaybeSession, uri: Uri) -> Response {
    let Some(page) = find_page(uri.path()) else {
        return not_found().await.into_response();
    };

    let class = state.routes.classify(uri.path());
    let snapshot = match &session {
        Some(session) => {
            resolve_identity(state.provider.as_ref(), &session.credentials, state.config.resolve_timeout)
                .await
                .into_snapshot(1)
        }
        None => IdentitySnapshot { state: IdentityState::Unauthenticated, notice: None, revision: 1 },
    };

    match evaluate(class, &snapshot, &state.routes) {
        LayoutDecision::Redirect(_) if session.is_some() && snapshot.notice.is_some() => {
            // The lookup failed, not the session: keep the cookies and let the
            // visitor retry.
            tracing::warn!(path = %uri.path(), "identity unavailable for a live session");
            let notice = snapshot.notice.as_deref();
            (StatusCode::SERVICE_UNAVAILABLE, Html(placeholder(page, notice))).into_response()
        }
        LayoutDecision::Redirect(target) if target == state.routes.login && session.is_some() => {
            // The provider answered: no user or no profile behind this
            // session. Drop it so the login page is not bounced straight back.
            tracing::info!(path = %uri.path(), state = ?snapshot.state, "session without usable identity; clearing cookies");
            let jar = clear_session_cookies(state.config.cookie_secure)
                .into_iter()
                .fold(CookieJar::new(), CookieJar::add);
            (jar, Redirect::temporary(target)).into_response()
        }
        LayoutDecision::Redirect(target) => Redirect::temporary(target).into_response(),
        LayoutDecision::Placeholder => Html(placeholder(page, None)).into_response(),
        LayoutDecision::Render => Html(shell(page, &snapshot)).into_response(),
    }
}

pub async fn not_found() -> (StatusCode, Html<&'static str>) {
    (StatusCode::NOT_FOUND, Html("<!doctype html><title>Not found</title><h1>Page not found</h1>"))
}

// =============================================================================
// HTML
// =============================================================================

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn document(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{} | Clinic Portal</title>\n<link rel=\"stylesheet\" href=\"/static/portal.css\">\n\
         </head>\n<body>\n{body}</body>\n</html>\n",
        escape(title)
    )
}

fn placeholder(page: &Page, notice: Option<&str>) -> String {
    let notice = notice
        .map(|n| format!("<p class=\"notice\" role=\"status\">{}</p>\n", escape(n)))
        .unwrap_or_default();
    document(page.title, &format!("{notice}<main aria-busy=\"true\"><p>Loading…</p></main>\n"))
}

fn display_name(snapshot: &IdentitySnapshot) -> Option<&str> {
    snapshot
        .profile()
        .map(|p| p.full_name.as_str())
        .or_else(|| snapshot.user().and_then(|u| u.email.as_deref()))
}

fn shell(page: &Page, snapshot: &IdentitySnapshot) -> String {
    let mut body = String::new();

    if let Some(name) = display_name(snapshot) {
        let role = snapshot.role().map(Role::as_str).unwrap_or_default();
        body.push_str(&format!(
            "<header><span class=\"user\">{}</span> <span class=\"role\">{}</span></header>\n",
            escape(name),
            role
        ));
    }

    let items = visible_items(snapshot.profile());
    if !items.is_empty() {
        body.push_str("<nav><ul>\n");
        for item in items {
            body.push_str(&format!("<li><a href=\"{}\">{}</a></li>\n", item.path, escape(item.label)));
        }
        body.push_str("</ul></nav>\n");
    }

    if let Some(notice) = &snapshot.notice {
        body.push_str(&format!("<p class=\"notice\" role=\"status\">{}</p>\n", escape(notice)));
    }

    body.push_str(&format!("<main data-page=\"{}\"><h1>{}</h1></main>\n", page.path, escape(page.title)));
    document(page.title, &body)
}

#[cfg(test)]
#[path = "pages_test.rs"]
mod tests;
