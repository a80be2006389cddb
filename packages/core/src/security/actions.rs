//! Action Tables
//!
//! Each content type exposes its mutating operations as named actions, each
//! guarded by a permission. Tables are layered along the kind hierarchy
//! (node, content, container, application root) and merged once when the type
//! is registered; later layers and per-type declarations win on name collision.

use crate::models::NodeKind;
use crate::security::permissions::{
    Permission, DELETE_CONTENT, MODIFY_CONTENT, RENAME_CONTENT, SHARE_CONTENT, VIEW,
};
use std::collections::BTreeMap;

/// Operation an action dispatches to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionMethod {
    Create,
    Update,
    Delete,
    Rename,
    Share,
    BatchDelete,
}

impl ActionMethod {
    pub fn name(&self) -> &'static str {
        match self {
            ActionMethod::Create => "create",
            ActionMethod::Update => "update",
            ActionMethod::Delete => "delete",
            ActionMethod::Rename => "rename",
            ActionMethod::Share => "share",
            ActionMethod::BatchDelete => "batchdelete",
        }
    }
}

/// `(method, required permission)` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSpec {
    pub method: ActionMethod,
    pub permission: Permission,
}

impl ActionSpec {
    /// Action guarded by the default `View` permission
    pub fn new(method: ActionMethod) -> Self {
        Self {
            method,
            permission: VIEW,
        }
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permission = permission;
        self
    }
}

/// Named actions available on a type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionTable {
    actions: BTreeMap<String, ActionSpec>,
}

impl ActionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare (or redeclare) an action
    pub fn declare(mut self, name: impl Into<String>, spec: ActionSpec) -> Self {
        self.actions.insert(name.into(), spec);
        self
    }

    /// Merge `other` over this table
    pub fn merge(mut self, other: &ActionTable) -> Self {
        for (name, spec) in &other.actions {
            self.actions.insert(name.clone(), spec.clone());
        }
        self
    }

    /// Actions declared by bare nodes
    pub fn node_layer() -> Self {
        Self::new()
    }

    /// Actions declared by content
    pub fn content_layer() -> Self {
        Self::new()
            .declare(
                "update",
                ActionSpec::new(ActionMethod::Update).with_permission(MODIFY_CONTENT),
            )
            .declare(
                "delete",
                ActionSpec::new(ActionMethod::Delete).with_permission(DELETE_CONTENT),
            )
            .declare(
                "rename",
                ActionSpec::new(ActionMethod::Rename).with_permission(RENAME_CONTENT),
            )
            .declare(
                "share",
                ActionSpec::new(ActionMethod::Share).with_permission(SHARE_CONTENT),
            )
    }

    /// Actions declared by containers
    ///
    /// `create` only needs `View` here; the created type's own permission is
    /// checked against the container by the type registry.
    pub fn container_layer() -> Self {
        Self::new()
            .declare("create", ActionSpec::new(ActionMethod::Create))
            .declare(
                "batchdelete",
                ActionSpec::new(ActionMethod::BatchDelete).with_permission(DELETE_CONTENT),
            )
    }

    /// Merged table for a kind, walking its ancestors first
    pub fn for_kind(kind: &NodeKind) -> Self {
        let mut layers = vec![Self::node_layer()];
        if kind.is_content() {
            layers.push(Self::content_layer());
        }
        if kind.is_container() {
            layers.push(Self::container_layer());
        }

        layers
            .iter()
            .fold(Self::new(), |table, layer| table.merge(layer))
    }

    pub fn get(&self, name: &str) -> Option<&ActionSpec> {
        self.actions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
