//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers and the route guard via the
//! `State` extractor. It carries configuration, the auth provider, and the
//! fixed route table. Identity is not stored here; it is resolved per
//! request or per stream and handed to whoever needs it.

use std::sync::Arc;

use crate::config::GateConfig;
use crate::guard::RouteTable;
use crate::provider::AuthProvider;

/// Clone is required by Axum; every field is Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GateConfig>,
    pub provider: Arc<dyn AuthProvider>,
    pub routes: Arc<RouteTable>,
}

impl AppState {
    #[must_use]
    pub fn new(config: GateConfig, provider: Arc<dyn AuthProvider>, routes: RouteTable) -> Self {
        Self { config: Arc::new(config), provider, routes: Arc::new(routes) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
