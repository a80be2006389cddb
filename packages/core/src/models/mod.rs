//! Data Models
//!
//! Persisted records of the content tree:
//!
//! - [`Node`]: tagged-variant record for nodes, content, containers and roots
//! - [`Blob`]: binary attachment addressed by its own URI
//! - [`Fieldset`]: declared user-editable fields of a type

mod blob;
mod fieldset;
mod node;

pub use blob::{Blob, BLOB_URI_TYPE};
pub(crate) use fieldset::capitalize;
pub use fieldset::{
    content_name_schema, content_schema, Field, FieldError, FieldType, Fieldset, Validator,
    NAME_FIELD,
};
pub use node::{ContentFields, LocalRoles, Node, NodeKind, ValidationError};
