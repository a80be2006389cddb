//! Database Layer
//!
//! This module handles persistence of nodes and blobs:
//!
//! - `NodeStore` trait: the storage abstraction used by the content services
//! - `MemoryStore`: in-memory implementation for tests and ephemeral sites
//! - `SqliteStore`: embedded libsql implementation (feature `turso`)
//!
//! Every backend enforces unique URIs and unique names among siblings, so a
//! race between two writers choosing the same name fails in storage rather
//! than producing duplicate keys.

mod error;
mod memory_store;
mod node_store;
#[cfg(feature = "turso")]
mod sqlite_store;

pub use error::DatabaseError;
pub use memory_store::MemoryStore;
pub use node_store::NodeStore;
#[cfg(feature = "turso")]
pub use sqlite_store::SqliteStore;
