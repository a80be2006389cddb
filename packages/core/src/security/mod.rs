//! Security Layer
//!
//! Permissions, the authorization policy, per-type action tables and the
//! `NodeWrapper` that gates every mutating content operation.

pub mod actions;
pub mod permissions;
pub mod policy;
mod wrapper;

pub use actions::{ActionMethod, ActionSpec, ActionTable};
pub use permissions::{
    Permission, RoleMap, ADD_CONTENT, AUTHENTICATED, DELETE_CONTENT, EVERYONE, MODIFY_CONTENT,
    NOT_ALLOWED, NO_PERMISSION_REQUIRED, RENAME_CONTENT, ROLE_EDITOR, ROLE_MANAGER, ROLE_OWNER,
    ROLE_VIEWER, SHAREABLE_ROLES, SHARE_CONTENT, VIEW,
};
pub use policy::{AuthContext, LocalRolesPolicy, PermissionCheck, SecurityPolicy};
pub use wrapper::{ActionArgs, ActionOutcome, BoundAction, NodeWrapper};
