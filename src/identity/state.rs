//! Identity snapshot shared with layouts and the identity stream.

use serde::Serialize;

use crate::provider::{AuthUser, Profile, Role};

/// Who is logged in, as far as the bootstrap knows right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IdentityState {
    /// Resolution has not finished yet.
    Loading,
    Authenticated { user: AuthUser, profile: Profile },
    /// Signed in, but the profile row has not been provisioned. Layouts treat
    /// this as signed out; the raw user is kept.
    ProfileMissing { user: AuthUser },
    Unauthenticated,
}

/// One published version of the identity slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentitySnapshot {
    #[serde(flatten)]
    pub state: IdentityState,
    /// Transient message for the user when resolution failed.
    pub notice: Option<String>,
    /// Bumped on every publish; 0 is the initial `Loading` snapshot.
    pub revision: u64,
}

impl IdentitySnapshot {
    #[must_use]
    pub fn loading() -> Self {
        Self { state: IdentityState::Loading, notice: None, revision: 0 }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self.state, IdentityState::Loading)
    }

    #[must_use]
    pub fn user(&self) -> Option<&AuthUser> {
        match &self.state {
            IdentityState::Authenticated { user, .. } | IdentityState::ProfileMissing { user } => Some(user),
            IdentityState::Loading | IdentityState::Unauthenticated => None,
        }
    }

    #[must_use]
    pub fn profile(&self) -> Option<&Profile> {
        match &self.state {
            IdentityState::Authenticated { profile, .. } => Some(profile),
            _ => None,
        }
    }

    /// The only identity signal routing decisions may use.
    #[must_use]
    pub fn has_profile(&self) -> bool {
        self.profile().is_some()
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.profile().map(|p| p.role)
    }
}
