//! Identity: who is signed in, and what the portal shows them.
//!
//! SYSTEM CONTEXT
//! ==============
//! The route guard only knows whether a session exists. Pages and the
//! identity stream need the user and their profile, which this module
//! resolves through the `AuthProvider`. Routing and navigation read the
//! resulting `IdentitySnapshot`; they never call the provider themselves.

pub mod bootstrap;
pub mod layout;
pub mod navigation;
pub mod state;

pub use bootstrap::{IdentityBootstrap, Resolved, resolve_identity};
pub use layout::{LayoutDecision, evaluate};
pub use navigation::{NAV_ITEMS, NavItem, visible_items};
pub use state::{IdentitySnapshot, IdentityState};
