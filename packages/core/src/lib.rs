//! Ptah CMS Core Content Layer
//!
//! This crate provides the content tree, the type registry and the
//! permission-gated content actions of the Ptah CMS.
//!
//! # Architecture
//!
//! - **Node store**: Every node is a row keyed by URI, with parent link, name and
//!   materialized path. `MemoryStore` for tests and tooling, `SqliteStore` (libsql)
//!   for persistent sites
//! - **Registry**: Content types, URI resolvers and application roots are declared
//!   once at startup, frozen, then shared as `Arc<Registry>`
//! - **Permission gate**: Mutations go through a `NodeWrapper` which checks the
//!   action's permission against the node lineage before any write
//! - **Events**: Lifecycle hooks observe created/added/moved/modified/deleting/deleted
//!
//! # Modules
//!
//! - [`models`] - Node, blob and fieldset data structures
//! - [`db`] - Node store trait and its memory/libsql implementations
//! - [`registry`] - Type information, URI resolution and registry lifecycle
//! - [`security`] - Permissions, roles, policies and the action gate
//! - [`services`] - Content service, containers, traversal, blobs, applications, model management
//! - [`forms`] - Add, edit, rename, delete and share form flows
//! - [`config`] - Site settings loaded from TOML and `PTAHCMS_*` environment variables
//! - [`utils`] - Name normalization

pub mod config;
pub mod db;
pub mod forms;
pub mod models;
pub mod registry;
pub mod security;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::{CmsSettings, ConfigError};
pub use db::{DatabaseError, MemoryStore, NodeStore};
pub use models::{Node, NodeKind};
pub use registry::{Registry, RegistryBuilder, TypeInformation};
pub use security::{AuthContext, NodeWrapper, Permission};
pub use services::{
    ApplicationFactory, CmsError, ContentEvent, ContentHook, ContentService, ContentTraverser,
    ErrorKind,
};
