//! URI generation and resolver dispatch.
//!
//! URIs have the form `<type>:<identifier>`. Resolution dispatches on the type
//! prefix to the resolver registered for it; a URI without a colon never
//! resolves.

use crate::db::{DatabaseError, NodeStore};
use crate::models::{Blob, Node};
use crate::registry::TypeInformation;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Generates unique URIs namespaced by a type prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UuidGenerator {
    prefix: String,
}

impl UuidGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// `"<prefix>:<32 lowercase hex digits>"`
    pub fn generate(&self) -> String {
        format!("{}:{}", self.prefix, Uuid::new_v4().simple())
    }
}

/// Type prefix of a URI, `None` when the URI is malformed
pub fn extract_uri_type(uri: &str) -> Option<&str> {
    match uri.split_once(':') {
        Some((prefix, _)) if !prefix.is_empty() => Some(prefix),
        _ => None,
    }
}

/// Object a URI resolved to
#[derive(Debug, Clone)]
pub enum Resolved {
    Node(Node),
    Blob(Blob),
    Type(Arc<TypeInformation>),
    /// Produced by application resolvers
    Value(Value),
}

impl Resolved {
    pub fn into_node(self) -> Option<Node> {
        match self {
            Resolved::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn into_blob(self) -> Option<Blob> {
        match self {
            Resolved::Blob(blob) => Some(blob),
            _ => None,
        }
    }

    pub fn into_type(self) -> Option<Arc<TypeInformation>> {
        match self {
            Resolved::Type(tinfo) => Some(tinfo),
            _ => None,
        }
    }
}

/// Application-provided resolver for a URI prefix
#[async_trait]
pub trait UriResolver: Send + Sync {
    async fn resolve(
        &self,
        uri: &str,
        store: &dyn NodeStore,
    ) -> Result<Option<Resolved>, DatabaseError>;
}

/// Resolver registered for a prefix
#[derive(Clone)]
pub enum ResolverKind {
    /// `type:<name>` → registered type information
    TypeInfo,
    /// `type-<name>:<hex>` → stored node
    Node,
    /// `blob-sql:<hex>` → stored blob
    Blob,
    Custom(Arc<dyn UriResolver>),
}

impl fmt::Debug for ResolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolverKind::TypeInfo => f.write_str("TypeInfo"),
            ResolverKind::Node => f.write_str("Node"),
            ResolverKind::Blob => f.write_str("Blob"),
            ResolverKind::Custom(_) => f.write_str("Custom"),
        }
    }
}
