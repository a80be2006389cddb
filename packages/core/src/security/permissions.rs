//! Permissions, roles and the role→permission maps used by the default policy.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Named permission checked against a node
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const fn from_static(id: &'static str) -> Self {
        Self(Cow::Borrowed(id))
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(Cow::Owned(id.into()))
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub const VIEW: Permission = Permission::from_static("View");
pub const ADD_CONTENT: Permission = Permission::from_static("ptah-cms:Add");
pub const DELETE_CONTENT: Permission = Permission::from_static("ptah-cms:Delete");
pub const MODIFY_CONTENT: Permission = Permission::from_static("ptah-cms:Edit");
pub const RENAME_CONTENT: Permission = Permission::from_static("ptah-cms:Rename");
pub const SHARE_CONTENT: Permission = Permission::from_static("ptah-cms:Share");

/// Never granted, not even to the superuser
pub const NOT_ALLOWED: Permission = Permission::from_static("__not_allowed__");

/// Always granted
pub const NO_PERMISSION_REQUIRED: Permission =
    Permission::from_static("__no_permission_required__");

pub const EVERYONE: &str = "system.Everyone";
pub const AUTHENTICATED: &str = "system.Authenticated";

pub const ROLE_VIEWER: &str = "role:Viewer";
pub const ROLE_EDITOR: &str = "role:Editor";
pub const ROLE_MANAGER: &str = "role:Manager";
pub const ROLE_OWNER: &str = "role:Owner";

/// Roles that may be granted locally through sharing
pub const SHAREABLE_ROLES: &[&str] = &[ROLE_VIEWER, ROLE_EDITOR, ROLE_MANAGER];

/// Role (or principal) → granted permissions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleMap {
    grants: BTreeMap<String, BTreeSet<Permission>>,
}

impl RoleMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(mut self, role: &str, permissions: &[Permission]) -> Self {
        self.grants
            .entry(role.to_string())
            .or_default()
            .extend(permissions.iter().cloned());
        self
    }

    pub fn permits<'a>(
        &self,
        roles: impl IntoIterator<Item = &'a str>,
        permission: &Permission,
    ) -> bool {
        roles.into_iter().any(|role| {
            self.grants
                .get(role)
                .map(|granted| granted.contains(permission))
                .unwrap_or(false)
        })
    }

    /// Default content map: everyone views, editors edit, managers and owners share
    pub fn cms_default() -> Self {
        let edit = [
            VIEW,
            ADD_CONTENT,
            MODIFY_CONTENT,
            RENAME_CONTENT,
            DELETE_CONTENT,
        ];
        let manage = [
            VIEW,
            ADD_CONTENT,
            MODIFY_CONTENT,
            RENAME_CONTENT,
            DELETE_CONTENT,
            SHARE_CONTENT,
        ];
        Self::new()
            .allow(EVERYONE, &[VIEW])
            .allow(ROLE_VIEWER, &[VIEW])
            .allow(ROLE_EDITOR, &edit)
            .allow(ROLE_MANAGER, &manage)
            .allow(ROLE_OWNER, &manage)
    }
}
