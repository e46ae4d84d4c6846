//! Edge route guard.
//!
//! SYSTEM CONTEXT
//! ==============
//! Runs in front of every page, API, and stream route. It decides from the
//! path and the presence of a session alone; identity details (profile,
//! role) are the identity module's concern.

pub mod middleware;
pub mod table;

pub use middleware::{GuardDecision, decide, route_guard};
pub use table::{RouteClass, RouteTable, is_excluded};
