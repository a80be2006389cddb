//! Node Data Structures
//!
//! This module defines the persisted `Node` record and its content columns.
//!
//! # Architecture
//!
//! - **Tagged variant**: a single struct represents bare nodes, content, containers
//!   and application roots; `kind` is the variant tag and `type_name` is the
//!   discriminator resolved through the type registry
//! - **URI addressed**: every node carries a globally unique, type-prefixed URI
//! - **Parent by URI**: containment is expressed by `parent_uri`, children are found
//!   by querying on it
//! - **Per-type fields**: values not covered by the content columns live in the
//!   `properties` JSON object
//!
//! # Examples
//!
//! ```rust
//! use ptahcms_core::models::{Node, NodeKind};
//!
//! let folder = Node::new("type-folder:0f3c".to_string(), "folder", NodeKind::Container);
//! assert!(folder.is_container());
//! assert_eq!(folder.name(), "");
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Per-principal role grants stored on a node
pub type LocalRoles = BTreeMap<String, Vec<String>>;

/// Validation errors for node field access
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Node '{0}' is not content")]
    NotContent(String),

    #[error("Invalid value for field '{field}': {reason}")]
    InvalidFieldValue { field: String, reason: String },
}

/// Variant tag of a node record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    /// Bare persisted node without content columns
    Node,
    /// Titled, placeable content
    Content,
    /// Content that holds children
    Container,
    /// Root container bound to a URL mount point
    ApplicationRoot {
        /// Mount point, always ending with `/`
        root_path: String,
    },
}

impl NodeKind {
    pub fn is_content(&self) -> bool {
        !matches!(self, NodeKind::Node)
    }

    pub fn is_container(&self) -> bool {
        matches!(self, NodeKind::Container | NodeKind::ApplicationRoot { .. })
    }

    pub fn is_root(&self) -> bool {
        matches!(self, NodeKind::ApplicationRoot { .. })
    }

    /// Storage label for the variant
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Node => "node",
            NodeKind::Content => "content",
            NodeKind::Container => "container",
            NodeKind::ApplicationRoot { .. } => "application_root",
        }
    }
}

/// Content columns shared by every content kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentFields {
    /// Key of the item inside its container
    pub name: String,

    /// Materialized traversal path: `parent.path + name + "/"`
    pub path: String,

    pub title: String,
    pub description: String,

    /// Visible to callers lacking View permission
    pub public: bool,

    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub effective: Option<DateTime<Utc>>,
    pub expires: Option<DateTime<Utc>>,

    pub lang: String,
}

impl Default for ContentFields {
    fn default() -> Self {
        Self {
            name: String::new(),
            path: String::new(),
            title: String::new(),
            description: String::new(),
            public: false,
            created: None,
            modified: None,
            effective: None,
            expires: None,
            lang: "en".to_string(),
        }
    }
}

/// Persisted, URI-addressable object
///
/// # Fields
///
/// - `id`: Numeric storage key, `None` until the node is inserted
/// - `uri`: Globally unique, type-prefixed identifier (`type-page:<hex>`)
/// - `type_name`: Registered type this record belongs to
/// - `kind`: Variant tag (node, content, container, application root)
/// - `parent_uri`: URI of the containing node
/// - `owner`: Principal that created the node
/// - `acls`: Names of the ACL maps that apply from this node downwards
/// - `local_roles`: Per-principal role grants
/// - `content`: Content columns, `None` for bare nodes
/// - `properties`: Remaining per-type field values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: Option<i64>,
    pub uri: String,
    pub type_name: String,
    #[serde(flatten)]
    pub kind: NodeKind,
    pub parent_uri: Option<String>,
    pub owner: Option<String>,
    #[serde(default)]
    pub acls: Vec<String>,
    #[serde(default)]
    pub local_roles: LocalRoles,
    pub content: Option<ContentFields>,
    #[serde(default = "empty_object")]
    pub properties: Value,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl Node {
    /// Create an unsaved node
    ///
    /// Content kinds start with default content columns; bare nodes have none.
    pub fn new(uri: String, type_name: impl Into<String>, kind: NodeKind) -> Self {
        let content = kind.is_content().then(ContentFields::default);
        Self {
            id: None,
            uri,
            type_name: type_name.into(),
            kind,
            parent_uri: None,
            owner: None,
            acls: Vec::new(),
            local_roles: LocalRoles::new(),
            content,
            properties: empty_object(),
        }
    }

    pub fn is_content(&self) -> bool {
        self.content.is_some()
    }

    pub fn is_container(&self) -> bool {
        self.is_content() && self.kind.is_container()
    }

    pub fn is_root(&self) -> bool {
        self.kind.is_root()
    }

    /// Whether the node has been written to storage
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Mount point of an application root
    pub fn root_path(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::ApplicationRoot { root_path } => Some(root_path),
            _ => None,
        }
    }

    /// Content columns, or `NotContent` for bare nodes
    pub fn content(&self) -> Result<&ContentFields, ValidationError> {
        self.content
            .as_ref()
            .ok_or_else(|| ValidationError::NotContent(self.uri.clone()))
    }

    pub fn content_mut(&mut self) -> Result<&mut ContentFields, ValidationError> {
        let uri = self.uri.clone();
        self.content
            .as_mut()
            .ok_or(ValidationError::NotContent(uri))
    }

    /// Name inside the container, empty for bare nodes
    pub fn name(&self) -> &str {
        self.content.as_ref().map(|c| c.name.as_str()).unwrap_or("")
    }

    /// Traversal path, empty for bare nodes
    pub fn path(&self) -> &str {
        self.content.as_ref().map(|c| c.path.as_str()).unwrap_or("")
    }

    pub fn title(&self) -> &str {
        self.content.as_ref().map(|c| c.title.as_str()).unwrap_or("")
    }

    /// Read a fieldset value
    ///
    /// Content column names map to their columns, anything else is read from
    /// `properties`. Missing values are returned as `Value::Null`.
    pub fn field(&self, name: &str) -> Value {
        if let Some(content) = &self.content {
            match name {
                "title" => return json!(content.title),
                "description" => return json!(content.description),
                "public" => return json!(content.public),
                "lang" => return json!(content.lang),
                "effective" => return json!(content.effective),
                "expires" => return json!(content.expires),
                "created" => return json!(content.created),
                "modified" => return json!(content.modified),
                _ => {}
            }
        }
        self.properties.get(name).cloned().unwrap_or(Value::Null)
    }

    /// Write a fieldset value
    ///
    /// # Errors
    ///
    /// Returns `InvalidFieldValue` when a content column receives a value of the
    /// wrong JSON type.
    pub fn set_field(&mut self, name: &str, value: Value) -> Result<(), ValidationError> {
        if let Some(content) = self.content.as_mut() {
            match name {
                "title" => {
                    content.title = expect_string(name, value)?;
                    return Ok(());
                }
                "description" => {
                    content.description = expect_string(name, value)?;
                    return Ok(());
                }
                "lang" => {
                    content.lang = expect_string(name, value)?;
                    return Ok(());
                }
                "public" => {
                    content.public = match value {
                        Value::Bool(b) => b,
                        Value::Null => false,
                        other => return Err(invalid(name, format!("expected bool, got {other}"))),
                    };
                    return Ok(());
                }
                "effective" | "expires" => {
                    let parsed = expect_datetime(name, value)?;
                    if name == "effective" {
                        content.effective = parsed;
                    } else {
                        content.expires = parsed;
                    }
                    return Ok(());
                }
                _ => {}
            }
        }

        if !self.properties.is_object() {
            self.properties = empty_object();
        }
        if let Value::Object(map) = &mut self.properties {
            map.insert(name.to_string(), value);
        }
        Ok(())
    }

    /// Introspection record used by management screens and REST listings
    pub fn info(&self, fields: &[&str]) -> Value {
        let mut info = Map::new();
        info.insert("__uri__".into(), json!(self.uri));
        info.insert("__type__".into(), json!(self.type_name));
        info.insert("__parent__".into(), json!(self.parent_uri));
        info.insert("__owner__".into(), json!(self.owner));
        info.insert("__local_roles__".into(), json!(self.local_roles));
        info.insert("__acls__".into(), json!(self.acls));

        if let Some(content) = &self.content {
            info.insert("__name__".into(), json!(content.name));
            info.insert("__content__".into(), json!(true));
            info.insert("__container__".into(), json!(self.kind.is_container()));
            for field in fields {
                info.insert((*field).to_string(), self.field(field));
            }
            info.insert("created".into(), json!(content.created));
            info.insert("modified".into(), json!(content.modified));
            info.insert("effective".into(), json!(content.effective));
            info.insert("expires".into(), json!(content.expires));
        }

        Value::Object(info)
    }
}

fn invalid(field: &str, reason: String) -> ValidationError {
    ValidationError::InvalidFieldValue {
        field: field.to_string(),
        reason,
    }
}

fn expect_string(field: &str, value: Value) -> Result<String, ValidationError> {
    match value {
        Value::String(s) => Ok(s),
        Value::Null => Ok(String::new()),
        other => Err(invalid(field, format!("expected string, got {other}"))),
    }
}

fn expect_datetime(field: &str, value: Value) -> Result<Option<DateTime<Utc>>, ValidationError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| invalid(field, e.to_string())),
        other => Err(invalid(field, format!("expected RFC3339 string, got {other}"))),
    }
}
