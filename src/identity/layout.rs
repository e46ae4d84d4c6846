//! Layout gate: what a page does with the current identity snapshot.

use super::state::IdentitySnapshot;
use crate::guard::{RouteClass, RouteTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutDecision {
    /// Identity is still resolving; show the loading shell.
    Placeholder,
    Redirect(&'static str),
    Render,
}

/// Decide from the snapshot as it is right now. Callers re-run this on every
/// new snapshot; nothing here is remembered between calls.
///
/// Only `is_loading()` and `has_profile()` are read. A signed-in user without
/// a profile row is treated as signed out.
#[must_use]
pub fn evaluate(class: RouteClass, snapshot: &IdentitySnapshot, table: &RouteTable) -> LayoutDecision {
    match class {
        RouteClass::Protected if snapshot.is_loading() => LayoutDecision::Placeholder,
        RouteClass::Protected if !snapshot.has_profile() => LayoutDecision::Redirect(table.login),
        RouteClass::AuthOnly if snapshot.has_profile() => LayoutDecision::Redirect(table.dashboard),
        _ => LayoutDecision::Render,
    }
}

#[cfg(test)]
#[path = "layout_test.rs"]
mod tests;
