//! Role-based sidebar navigation.

use serde::Serialize;

use crate::provider::{Profile, Role};

const ALL_ROLES: &[Role] = &[Role::Admin, Role::Doctor, Role::Support];
const CLINICAL: &[Role] = &[Role::Admin, Role::Doctor];
const ADMIN_ONLY: &[Role] = &[Role::Admin];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub label: &'static str,
    pub path: &'static str,
    #[serde(skip)]
    pub roles: &'static [Role],
}

impl NavItem {
    #[must_use]
    pub fn allows(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

pub const NAV_ITEMS: &[NavItem] = &[
    NavItem { label: "Dashboard", path: "/dashboard", roles: ALL_ROLES },
    NavItem { label: "Patients", path: "/patients", roles: CLINICAL },
    NavItem { label: "Appointments", path: "/appointments", roles: ALL_ROLES },
    NavItem { label: "Messages", path: "/messages", roles: ALL_ROLES },
    NavItem { label: "Clinical Notes", path: "/notes", roles: CLINICAL },
    NavItem { label: "Availability", path: "/availability", roles: CLINICAL },
    NavItem { label: "Settings", path: "/settings", roles: ADMIN_ONLY },
];

/// Items the profile's role may see, in sidebar order. No profile, no items.
#[must_use]
pub fn visible_items(profile: Option<&Profile>) -> Vec<NavItem> {
    let Some(profile) = profile else {
        return Vec::new();
    };
    NAV_ITEMS.iter().filter(|item| item.allows(profile.role)).copied().collect()
}

#[cfg(test)]
#[path = "navigation_test.rs"]
mod tests;
