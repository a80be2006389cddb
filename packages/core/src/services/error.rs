//! Service Layer Error Types
//!
//! This module defines error types for content operations. Every variant maps
//! onto one of the taxonomy kinds reported by `CmsError::kind()`:
//!
//! - `NotFound`: unresolvable URI, unknown key, unregistered type or action
//! - `Forbidden`: permission check failure
//! - `Error`: domain constraint violation (invalid name, name collision,
//!   non-empty container deletion, self-containment)
//! - `Storage`: backend failures other than uniqueness constraints
//! - `Configuration`: startup-time registration problems

use crate::db::DatabaseError;
use crate::models::ValidationError;
use thiserror::Error;

/// Taxonomy of content errors as seen by the boundary framework
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    Error,
    Storage,
    Configuration,
}

/// Content operation errors
#[derive(Error, Debug)]
pub enum CmsError {
    /// Nothing is registered or stored under this URI or key
    #[error("Not found: {what}")]
    NotFound { what: String },

    /// Type information is not registered
    #[error("Type information is not found: {name}")]
    UnknownType { name: String },

    /// Action is not declared for the node's type
    #[error("Action '{action}' is not available for {uri}")]
    UnknownAction { action: String, uri: String },

    /// Caller lacks the required permission
    #[error("Permission '{permission}' required on {uri}")]
    Forbidden { permission: String, uri: String },

    /// Type may not be created inside the container
    #[error("Type '{type_name}' is not allowed in {container_uri}")]
    TypeNotAllowed {
        type_name: String,
        container_uri: String,
    },

    /// Name rejected before it reached the container
    #[error("{reason}")]
    InvalidName { name: String, reason: String },

    /// Another child of the container already uses this name
    #[error("Name already in use: {name}")]
    NameInUse { name: String },

    /// Item would become its own ancestor
    #[error("Can't set {item_uri} inside {container_uri}: {reason}")]
    SelfContainment {
        item_uri: String,
        container_uri: String,
        reason: String,
    },

    /// Operation requires a container
    #[error("Node is not a container: {uri}")]
    NotContainer { uri: String },

    /// Operation requires content
    #[error("Node is not content: {uri}")]
    NotContent { uri: String },

    /// Container still holds items
    #[error("Container is not empty: {uri}")]
    ContainerNotEmpty { uri: String },

    /// Application roots cannot be renamed or deleted
    #[error("Application root can't be {action}: {uri}")]
    RootProtected { action: String, uri: String },

    /// Content has no parent to act through
    #[error("Can't find parent of {uri}")]
    ParentMissing { uri: String },

    /// Arguments do not match the action being called
    #[error("Invalid arguments for action '{action}'")]
    InvalidArguments { action: String },

    /// Field value rejected by the model
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Storage backend failed
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    /// Reading blob data failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Two registrations claim the same identifier
    #[error("Configuration conflict: {kind} '{name}' registered twice")]
    ConfigurationConflict { kind: String, name: String },

    /// Invalid startup configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CmsError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn unknown_type(name: impl Into<String>) -> Self {
        Self::UnknownType { name: name.into() }
    }

    pub fn unknown_action(action: impl Into<String>, uri: impl Into<String>) -> Self {
        Self::UnknownAction {
            action: action.into(),
            uri: uri.into(),
        }
    }

    pub fn forbidden(permission: impl ToString, uri: impl Into<String>) -> Self {
        Self::Forbidden {
            permission: permission.to_string(),
            uri: uri.into(),
        }
    }

    pub fn type_not_allowed(type_name: impl Into<String>, container_uri: impl Into<String>) -> Self {
        Self::TypeNotAllowed {
            type_name: type_name.into(),
            container_uri: container_uri.into(),
        }
    }

    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn name_in_use(name: impl Into<String>) -> Self {
        Self::NameInUse { name: name.into() }
    }

    pub fn self_containment(
        item_uri: impl Into<String>,
        container_uri: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::SelfContainment {
            item_uri: item_uri.into(),
            container_uri: container_uri.into(),
            reason: reason.into(),
        }
    }

    pub fn not_container(uri: impl Into<String>) -> Self {
        Self::NotContainer { uri: uri.into() }
    }

    pub fn not_content(uri: impl Into<String>) -> Self {
        Self::NotContent { uri: uri.into() }
    }

    pub fn container_not_empty(uri: impl Into<String>) -> Self {
        Self::ContainerNotEmpty { uri: uri.into() }
    }

    pub fn root_protected(action: impl Into<String>, uri: impl Into<String>) -> Self {
        Self::RootProtected {
            action: action.into(),
            uri: uri.into(),
        }
    }

    pub fn parent_missing(uri: impl Into<String>) -> Self {
        Self::ParentMissing { uri: uri.into() }
    }

    pub fn invalid_arguments(action: impl Into<String>) -> Self {
        Self::InvalidArguments {
            action: action.into(),
        }
    }

    pub fn configuration_conflict(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::ConfigurationConflict {
            kind: kind.into(),
            name: name.into(),
        }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Position of this error in the NotFound / Forbidden / Error taxonomy
    ///
    /// Storage uniqueness violations count as domain errors, so a lost race
    /// on an auto-generated name surfaces like any other name collision.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } | Self::UnknownType { .. } | Self::UnknownAction { .. } => {
                ErrorKind::NotFound
            }
            Self::Forbidden { .. } | Self::TypeNotAllowed { .. } => ErrorKind::Forbidden,
            Self::Database(DatabaseError::RecordNotFound { .. }) => ErrorKind::NotFound,
            Self::Database(err) if err.is_constraint_violation() => ErrorKind::Error,
            Self::Database(_) | Self::Io(_) => ErrorKind::Storage,
            Self::ConfigurationConflict { .. } | Self::Configuration(_) => {
                ErrorKind::Configuration
            }
            _ => ErrorKind::Error,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_forbidden(&self) -> bool {
        self.kind() == ErrorKind::Forbidden
    }
}
