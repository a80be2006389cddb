//! Business Services
//!
//! This module contains the content services:
//!
//! - `ContentService` - lookup, permission-gated actions and subtree maintenance
//! - `ContainerRef` - mapping view over a container's children
//! - `ContentTraverser` - URL path to content resolution
//! - `ApplicationFactory` - mounted application roots
//! - `BlobStorage` - binary attachments
//! - `ModelModule` - management listing of registered models
//!
//! Services coordinate between the storage layer and the type registry,
//! implementing the content tree rules and firing lifecycle events.

pub mod application;
pub mod blob_storage;
pub mod container;
pub mod content_service;
pub mod error;
pub mod events;
pub mod manage;
pub mod traverser;

pub use application::ApplicationFactory;
pub use blob_storage::{BlobMetadata, BlobStorage};
pub use container::ContainerRef;
pub use content_service::ContentService;
pub use error::{CmsError, ErrorKind};
pub use events::{ContentEvent, ContentHook};
pub use manage::{Model, ModelModule, ModelPage};
pub use traverser::{url_for, ContentTraverser, TraversalResult};
