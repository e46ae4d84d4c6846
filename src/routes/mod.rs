//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! One Axum router serves the auth API, the identity stream, the portal page
//! shells, and static assets. The route guard wraps all of it; it skips
//! static assets on its own, so everything else is classified and possibly
//! redirected before any handler runs.

pub mod auth;
pub mod pages;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::guard::route_guard;
use crate::state::AppState;

fn api_routes() -> Router<AppState> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/password/reset", post(auth::request_password_reset))
        .route("/api/auth/password/update", post(auth::update_password))
        .route("/api/auth/identity", get(auth::identity))
        .route("/api/auth/identity/stream", get(auth::identity_stream))
        .route("/healthz", get(healthz))
        .layer(cors)
}

/// The full application: API, pages, static assets, behind the route guard.
pub fn app(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();

    Router::new()
        .merge(api_routes())
        .merge(pages::routes())
        .nest_service("/static", ServeDir::new(&static_dir))
        .route_service("/favicon.ico", ServeFile::new(static_dir.join("favicon.ico")))
        .fallback(pages::not_found)
        .layer(middleware::from_fn_with_state(state.clone(), route_guard))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "router_test.rs"]
mod tests;
