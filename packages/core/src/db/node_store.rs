//! NodeStore Trait - Storage Abstraction Layer
//!
//! This module defines the `NodeStore` trait that abstracts persistence of
//! nodes and blobs. Content services only talk to this trait, so the in-memory
//! store and the libsql store are interchangeable.
//!
//! # Design Decisions
//!
//! 1. **Async-First**: every method is async so embedded SQL backends and the
//!    in-memory store share one interface
//! 2. **URI Keys**: nodes and blobs are addressed by URI; the numeric `id` is
//!    assigned on insert and only used for ordering
//! 3. **Uniqueness in Storage**: unique URI and unique `(parent_uri, name)` are
//!    enforced by every backend and reported as `DuplicateUri` / `DuplicateName`
//! 4. **Batch Writes**: `update_nodes` writes a set of nodes as one unit, which
//!    is how subtree path rewrites are committed; `delete_nodes` removes a
//!    cascade the same way
//!
//! # Examples
//!
//! ```rust
//! use ptahcms_core::db::{MemoryStore, NodeStore};
//! use ptahcms_core::models::{Node, NodeKind};
//!
//! # tokio_test::block_on(async {
//! let store = MemoryStore::new();
//! let node = Node::new("test:1".to_string(), "test", NodeKind::Node);
//! let stored = store.insert_node(node).await.unwrap();
//!
//! assert!(stored.id.is_some());
//! assert!(store.get_node("test:1").await.unwrap().is_some());
//! # });
//! ```

use crate::db::DatabaseError;
use crate::models::{Blob, Node};
use async_trait::async_trait;

/// Storage of nodes and blobs
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Insert a new node and return it with its assigned `id`
    ///
    /// # Errors
    ///
    /// - `DuplicateUri` if a node with the same URI exists
    /// - `DuplicateName` if the parent already has a child with the same name
    async fn insert_node(&self, node: Node) -> Result<Node, DatabaseError>;

    async fn get_node(&self, uri: &str) -> Result<Option<Node>, DatabaseError>;

    /// Overwrite a stored node
    ///
    /// # Errors
    ///
    /// - `RecordNotFound` if the node was never inserted
    /// - `DuplicateName` if the new `(parent_uri, name)` is taken by another node
    async fn update_node(&self, node: &Node) -> Result<(), DatabaseError>;

    /// Overwrite several stored nodes as one unit
    ///
    /// Either every node is written or none is.
    async fn update_nodes(&self, nodes: &[Node]) -> Result<(), DatabaseError>;

    /// Remove a node, returning whether it existed
    ///
    /// Children are not touched; cascading is the caller's job.
    async fn delete_node(&self, uri: &str) -> Result<bool, DatabaseError>;

    /// Remove several nodes as one unit, returning how many existed
    ///
    /// Either every listed node is removed or none is. Missing URIs are
    /// skipped; children not listed are left alone.
    async fn delete_nodes(&self, uris: &[String]) -> Result<usize, DatabaseError>;

    /// Names of the children of a node, in insertion order
    async fn child_names(&self, parent_uri: &str) -> Result<Vec<String>, DatabaseError>;

    /// Children of a node, in insertion order
    async fn children(&self, parent_uri: &str) -> Result<Vec<Node>, DatabaseError>;

    /// Child of a node by name
    async fn child(&self, parent_uri: &str, name: &str) -> Result<Option<Node>, DatabaseError>;

    /// Parentless node of the given type and name
    async fn find_root(&self, type_name: &str, name: &str) -> Result<Option<Node>, DatabaseError>;

    /// Nodes of a type ordered by `id`
    async fn nodes_by_type(
        &self,
        type_name: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Node>, DatabaseError>;

    async fn count_by_type(&self, type_name: &str) -> Result<usize, DatabaseError>;

    /// Insert a blob and return it with its assigned `id`
    async fn insert_blob(&self, blob: Blob) -> Result<Blob, DatabaseError>;

    async fn get_blob(&self, uri: &str) -> Result<Option<Blob>, DatabaseError>;

    async fn update_blob(&self, blob: &Blob) -> Result<(), DatabaseError>;

    async fn delete_blob(&self, uri: &str) -> Result<bool, DatabaseError>;

    /// First blob attached to a parent node
    async fn get_blob_by_parent(&self, parent_uri: &str) -> Result<Option<Blob>, DatabaseError>;
}
