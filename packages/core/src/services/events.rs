//! Content Lifecycle Events
//!
//! Content actions notify registered `ContentHook`s synchronously, after the
//! store write that caused the event. `Deleting` is the exception: it is
//! delivered before the node is removed so observers can still read it.
//!
//! # Event Flow
//!
//! 1. An action (create, update, rename, delete) mutates the store
//! 2. The action builds a `ContentEvent` carrying the affected node
//! 3. Every hook registered on the `ContentService` is called in order

use crate::models::Node;

/// Lifecycle events of content
#[derive(Debug, Clone, PartialEq)]
pub enum ContentEvent {
    /// A new node was instantiated and stored
    Created(Node),

    /// A parentless node was placed in a container
    Added(Node),

    /// A node changed container or name
    Moved(Node),

    /// Field values of a node were updated
    Modified(Node),

    /// A node is about to be removed
    Deleting(Node),

    /// A node was removed
    Deleted { uri: String },
}

impl ContentEvent {
    /// Get a string representation of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            ContentEvent::Created(_) => "created",
            ContentEvent::Added(_) => "added",
            ContentEvent::Moved(_) => "moved",
            ContentEvent::Modified(_) => "modified",
            ContentEvent::Deleting(_) => "deleting",
            ContentEvent::Deleted { .. } => "deleted",
        }
    }

    /// URI of the affected node
    pub fn uri(&self) -> &str {
        match self {
            ContentEvent::Created(node)
            | ContentEvent::Added(node)
            | ContentEvent::Moved(node)
            | ContentEvent::Modified(node)
            | ContentEvent::Deleting(node) => &node.uri,
            ContentEvent::Deleted { uri } => uri,
        }
    }
}

/// Observer of content lifecycle events
///
/// Hooks run on the caller's task and must not block.
pub trait ContentHook: Send + Sync {
    fn on_event(&self, event: &ContentEvent);
}
