//! Database Error Types
//!
//! This module defines error types for content storage operations, providing
//! clear error handling for connection, initialization, constraint and query failures.

use std::path::PathBuf;
use thiserror::Error;

/// Storage operation errors
///
/// Covers connection and schema setup for the SQL backend as well as the
/// uniqueness constraints every backend enforces (unique URI, unique name
/// among siblings). Higher-level constraint violations are reported by the
/// service layer as `CmsError`.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish database connection
    #[cfg(feature = "turso")]
    #[error("Failed to connect to database at {path}: {source}")]
    ConnectionFailed {
        path: PathBuf,
        source: libsql::Error,
    },

    /// Failed to initialize database schema
    #[error("Failed to initialize database schema: {0}")]
    InitializationFailed(String),

    /// Permission denied when accessing database
    #[error("Permission denied for database path: {path}")]
    PermissionDenied { path: PathBuf },

    /// Failed to create parent directory
    #[error("Failed to create parent directory for database: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    /// libsql operation error
    #[cfg(feature = "turso")]
    #[error("Database operation failed: {0}")]
    LibsqlError(#[from] libsql::Error),

    /// SQL execution error with context
    #[error("SQL execution failed: {context}")]
    SqlExecutionError { context: String },

    /// A record with this URI already exists
    #[error("Duplicate uri: {uri}")]
    DuplicateUri { uri: String },

    /// Another child of the same parent already uses this name
    #[error("Name '{name}' already used in {parent_uri}")]
    DuplicateName { parent_uri: String, name: String },

    /// Record expected to exist was not found
    #[error("Record not found: {uri}")]
    RecordNotFound { uri: String },

    /// Row could not be converted to or from its model
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DatabaseError {
    /// Create a connection failed error
    #[cfg(feature = "turso")]
    pub fn connection_failed(path: PathBuf, source: libsql::Error) -> Self {
        Self::ConnectionFailed { path, source }
    }

    /// Create an initialization failed error
    pub fn initialization_failed(msg: impl Into<String>) -> Self {
        Self::InitializationFailed(msg.into())
    }

    /// Create a permission denied error
    pub fn permission_denied(path: PathBuf) -> Self {
        Self::PermissionDenied { path }
    }

    /// Create a SQL execution error with context
    pub fn sql_execution(context: impl Into<String>) -> Self {
        Self::SqlExecutionError {
            context: context.into(),
        }
    }

    pub fn duplicate_uri(uri: impl Into<String>) -> Self {
        Self::DuplicateUri { uri: uri.into() }
    }

    pub fn duplicate_name(parent_uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self::DuplicateName {
            parent_uri: parent_uri.into(),
            name: name.into(),
        }
    }

    pub fn record_not_found(uri: impl Into<String>) -> Self {
        Self::RecordNotFound { uri: uri.into() }
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// True when the error is a storage-level uniqueness violation
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::DuplicateUri { .. } | Self::DuplicateName { .. })
    }
}

impl From<serde_json::Error> for DatabaseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
