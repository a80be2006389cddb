//! Authorization Policy
//!
//! Authentication is performed outside this crate; callers arrive as an
//! `AuthContext`. A `SecurityPolicy` decides whether that caller holds a
//! permission on a node, given the node's lineage (the node itself first,
//! then each parent up to the root).
//!
//! The default `LocalRolesPolicy` works as follows:
//!
//! 1. Roles = global roles of the caller, `system.Everyone`, `system.Authenticated`
//!    for identified callers, every local role granted to the caller on any node
//!    of the lineage, and `role:Owner` when the caller owns a node of the lineage.
//! 2. The role map is taken from the nearest node in the lineage that names ACL
//!    maps in `acls`; without one the default map applies.
//! 3. The permission is granted if any role is mapped to it.

use crate::models::Node;
use crate::security::permissions::{
    Permission, RoleMap, AUTHENTICATED, EVERYONE, NOT_ALLOWED, NO_PERMISSION_REQUIRED, ROLE_OWNER,
};
use std::collections::{BTreeMap, BTreeSet};

/// Identity of the caller performing an operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthContext {
    pub userid: Option<String>,
    /// Roles granted site-wide
    pub roles: Vec<String>,
    pub superuser: bool,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(userid: impl Into<String>) -> Self {
        Self {
            userid: Some(userid.into()),
            ..Self::default()
        }
    }

    pub fn superuser() -> Self {
        Self {
            userid: Some("ptah+auth:superuser".to_string()),
            roles: Vec::new(),
            superuser: true,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Principals this caller is known as
    pub fn principals(&self) -> Vec<&str> {
        let mut principals = vec![EVERYONE];
        if let Some(userid) = &self.userid {
            principals.push(AUTHENTICATED);
            principals.push(userid);
        }
        principals
    }
}

/// Decides permissions for a caller on a node lineage
pub trait SecurityPolicy: Send + Sync {
    /// `lineage[0]` is the node being checked, followed by its parents
    fn permits(&self, auth: &AuthContext, permission: &Permission, lineage: &[Node]) -> bool;
}

/// Applies the special permissions shared by every policy
///
/// Returns `Some(decision)` when the permission alone settles the check.
pub fn special_permission(auth: &AuthContext, permission: &Permission) -> Option<bool> {
    if *permission == NOT_ALLOWED {
        return Some(false);
    }
    if *permission == NO_PERMISSION_REQUIRED || auth.superuser {
        return Some(true);
    }
    None
}

/// Permission checks bound to one caller and one node lineage
#[derive(Clone, Copy)]
pub struct PermissionCheck<'a> {
    policy: &'a dyn SecurityPolicy,
    auth: &'a AuthContext,
    lineage: &'a [Node],
}

impl<'a> PermissionCheck<'a> {
    pub fn new(policy: &'a dyn SecurityPolicy, auth: &'a AuthContext, lineage: &'a [Node]) -> Self {
        Self {
            policy,
            auth,
            lineage,
        }
    }

    /// Node the checks apply to
    pub fn context(&self) -> Option<&'a Node> {
        self.lineage.first()
    }

    pub fn auth(&self) -> &'a AuthContext {
        self.auth
    }

    pub fn permits(&self, permission: &Permission) -> bool {
        self.policy.permits(self.auth, permission, self.lineage)
    }
}

/// Role-based policy with local roles and named ACL maps
#[derive(Debug, Clone)]
pub struct LocalRolesPolicy {
    default_map: RoleMap,
    acl_maps: BTreeMap<String, RoleMap>,
}

impl Default for LocalRolesPolicy {
    fn default() -> Self {
        Self::new(RoleMap::cms_default())
    }
}

impl LocalRolesPolicy {
    pub fn new(default_map: RoleMap) -> Self {
        Self {
            default_map,
            acl_maps: BTreeMap::new(),
        }
    }

    /// Register a named ACL map that nodes can reference through `acls`
    pub fn with_acl_map(mut self, name: impl Into<String>, map: RoleMap) -> Self {
        self.acl_maps.insert(name.into(), map);
        self
    }

    /// All roles the caller holds on the given lineage
    pub fn effective_roles(&self, auth: &AuthContext, lineage: &[Node]) -> BTreeSet<String> {
        let mut roles: BTreeSet<String> = auth
            .principals()
            .into_iter()
            .map(str::to_string)
            .collect();
        roles.extend(auth.roles.iter().cloned());

        if let Some(userid) = &auth.userid {
            for node in lineage {
                if node.owner.as_deref() == Some(userid.as_str()) {
                    roles.insert(ROLE_OWNER.to_string());
                }
                if let Some(local) = node.local_roles.get(userid) {
                    roles.extend(local.iter().cloned());
                }
            }
        }
        roles
    }

    fn maps_for<'a>(&'a self, lineage: &[Node]) -> Vec<&'a RoleMap> {
        let declared = lineage.iter().find(|node| !node.acls.is_empty());
        match declared {
            Some(node) => {
                let maps: Vec<&RoleMap> = node
                    .acls
                    .iter()
                    .filter_map(|name| self.acl_maps.get(name))
                    .collect();
                if maps.is_empty() {
                    vec![&self.default_map]
                } else {
                    maps
                }
            }
            None => vec![&self.default_map],
        }
    }
}

impl SecurityPolicy for LocalRolesPolicy {
    fn permits(&self, auth: &AuthContext, permission: &Permission, lineage: &[Node]) -> bool {
        if let Some(decision) = special_permission(auth, permission) {
            return decision;
        }

        let roles = self.effective_roles(auth, lineage);
        self.maps_for(lineage)
            .into_iter()
            .any(|map| map.permits(roles.iter().map(String::as_str), permission))
    }
}
