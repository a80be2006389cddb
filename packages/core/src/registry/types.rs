//! Type Information
//!
//! A `TypeInformation` is the contract of a content type: its schema, the
//! permission required to create it, where it may be placed, how instances are
//! built, and which actions its instances expose.
//!
//! # Examples
//!
//! ```rust
//! use ptahcms_core::models::NodeKind;
//! use ptahcms_core::registry::TypeInformation;
//!
//! let folder = TypeInformation::new("folder", NodeKind::Container)
//!     .title("Folder")
//!     .filter_content_types(true)
//!     .allowed_content_types(&["page"]);
//!
//! assert_eq!(folder.uri(), "type:folder");
//! assert!(folder.actions().contains("create"));
//! ```

use crate::models::{capitalize, content_schema, Fieldset, Node, NodeKind};
use crate::registry::{Registry, UuidGenerator};
use crate::security::{ActionSpec, ActionTable, Permission, PermissionCheck, ADD_CONTENT};
use crate::services::CmsError;
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Arc;

/// Builds an unsaved instance of a type
pub type NodeFactory = Arc<dyn Fn(&TypeInformation) -> Node + Send + Sync>;

/// Types a container accepts when `filter_content_types` is set
#[derive(Clone)]
pub enum AllowedTypes {
    Static(Vec<String>),
    /// Computed from the container instance
    Predicate(Arc<dyn Fn(&Node) -> Vec<String> + Send + Sync>),
}

impl AllowedTypes {
    pub fn names(&self, container: &Node) -> Vec<String> {
        match self {
            AllowedTypes::Static(names) => names.clone(),
            AllowedTypes::Predicate(predicate) => predicate(container),
        }
    }
}

impl fmt::Debug for AllowedTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllowedTypes::Static(names) => f.debug_tuple("Static").field(names).finish(),
            AllowedTypes::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Contract of a registered content type
#[derive(Clone)]
pub struct TypeInformation {
    pub name: String,
    pub title: String,
    pub description: String,
    pub kind: NodeKind,
    pub fieldset: Fieldset,
    /// Permission required on the container, `None` skips the check
    pub permission: Option<Permission>,
    /// Listed in every unfiltered container
    pub global_allow: bool,
    /// Restrict children of this type's containers to `allowed_content_types`
    pub filter_content_types: bool,
    pub allowed_content_types: AllowedTypes,
    /// Appended to names chosen by the add form
    pub name_suffix: String,
    uri_generator: UuidGenerator,
    factory: Option<NodeFactory>,
    declared_actions: ActionTable,
    actions: ActionTable,
}

impl TypeInformation {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        let name = name.into();
        let global_allow = kind.is_content();
        let actions = ActionTable::for_kind(&kind);
        Self {
            title: capitalize(&name),
            description: String::new(),
            uri_generator: UuidGenerator::new(format!("type-{name}")),
            name,
            kind,
            fieldset: content_schema(),
            permission: Some(ADD_CONTENT),
            global_allow,
            filter_content_types: false,
            allowed_content_types: AllowedTypes::Static(Vec::new()),
            name_suffix: String::new(),
            factory: None,
            declared_actions: ActionTable::new(),
            actions,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn fieldset(mut self, fieldset: Fieldset) -> Self {
        self.fieldset = fieldset;
        self
    }

    pub fn permission(mut self, permission: Option<Permission>) -> Self {
        self.permission = permission;
        self
    }

    pub fn global_allow(mut self, global_allow: bool) -> Self {
        self.global_allow = global_allow;
        self
    }

    pub fn filter_content_types(mut self, filter: bool) -> Self {
        self.filter_content_types = filter;
        self
    }

    pub fn allowed_content_types(mut self, names: &[&str]) -> Self {
        self.allowed_content_types =
            AllowedTypes::Static(names.iter().map(|n| n.to_string()).collect());
        self
    }

    pub fn allowed_content_types_fn<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Node) -> Vec<String> + Send + Sync + 'static,
    {
        self.allowed_content_types = AllowedTypes::Predicate(Arc::new(predicate));
        self
    }

    pub fn name_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.name_suffix = suffix.into();
        self
    }

    /// Override instance construction; the factory must return a node of this type
    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&TypeInformation) -> Node + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Declare a type-specific action, overriding an inherited one of the same name
    pub fn action(mut self, name: impl Into<String>, spec: ActionSpec) -> Self {
        self.declared_actions = self.declared_actions.declare(name, spec);
        self.actions = ActionTable::for_kind(&self.kind).merge(&self.declared_actions);
        self
    }

    /// `type:<name>`
    pub fn uri(&self) -> String {
        format!("type:{}", self.name)
    }

    /// Prefix of instance URIs, `type-<name>`
    pub fn uri_prefix(&self) -> &str {
        self.uri_generator.prefix()
    }

    pub fn generate_uri(&self) -> String {
        self.uri_generator.generate()
    }

    /// Merged action table of this type
    pub fn actions(&self) -> &ActionTable {
        &self.actions
    }

    /// Instantiate an unsaved node and apply the given field values
    pub fn create(&self, fields: &Map<String, Value>) -> Result<Node, CmsError> {
        let mut node = match &self.factory {
            Some(factory) => factory(self),
            None => Node::new(self.generate_uri(), self.name.clone(), self.kind.clone()),
        };
        for (name, value) in fields {
            node.set_field(name, value.clone())?;
        }
        Ok(node)
    }

    /// Whether an instance may be created inside the checked container
    ///
    /// The context must be a container and the caller must hold `permission`
    /// on it. Placement filters are applied by `check_context`.
    pub fn is_allowed(&self, check: &PermissionCheck<'_>) -> bool {
        let Some(container) = check.context() else {
            return false;
        };
        if !container.is_container() {
            return false;
        }
        match &self.permission {
            Some(permission) => check.permits(permission),
            None => true,
        }
    }

    /// Fail with a Forbidden-kind error unless creation in the context is allowed
    pub fn check_context(
        &self,
        check: &PermissionCheck<'_>,
        registry: &Registry,
    ) -> Result<(), CmsError> {
        let container = check
            .context()
            .ok_or_else(|| CmsError::not_found("container"))?;

        if !container.is_container() {
            return Err(CmsError::type_not_allowed(&self.name, &container.uri));
        }
        if !self.is_allowed(check) {
            let permission = self
                .permission
                .as_ref()
                .map(|p| p.to_string())
                .unwrap_or_default();
            return Err(CmsError::forbidden(permission, &container.uri));
        }

        if let Some(container_type) = registry.get_type(&container.type_name) {
            if container_type.filter_content_types
                && !container_type
                    .allowed_content_types
                    .names(container)
                    .iter()
                    .any(|name| *name == self.name)
            {
                return Err(CmsError::type_not_allowed(&self.name, &container.uri));
            }
        }
        Ok(())
    }

    /// Types that may be created inside a container of this type
    ///
    /// Empty unless the checked context is a container of this very type.
    pub fn list_types(
        &self,
        check: &PermissionCheck<'_>,
        registry: &Registry,
    ) -> Vec<Arc<TypeInformation>> {
        let Some(container) = check.context() else {
            return Vec::new();
        };
        if container.type_name != self.name || !container.is_container() {
            return Vec::new();
        }

        if self.filter_content_types {
            self.allowed_content_types
                .names(container)
                .iter()
                .filter_map(|name| registry.get_type(name))
                .filter(|tinfo| tinfo.is_allowed(check))
                .cloned()
                .collect()
        } else {
            registry
                .types()
                .filter(|tinfo| tinfo.global_allow && tinfo.is_allowed(check))
                .cloned()
                .collect()
        }
    }

    /// Introspection record of the type
    pub fn info(&self) -> Value {
        json!({
            "__uri__": self.uri(),
            "name": self.name,
            "title": self.title,
            "description": self.description,
            "kind": self.kind.label(),
            "permission": self.permission.as_ref().map(|p| p.to_string()),
            "global_allow": self.global_allow,
            "fieldset": self.fieldset.names(),
            "actions": self.actions.names().collect::<Vec<_>>(),
        })
    }
}

impl fmt::Debug for TypeInformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInformation")
            .field("name", &self.name)
            .field("title", &self.title)
            .field("kind", &self.kind)
            .field("permission", &self.permission)
            .field("global_allow", &self.global_allow)
            .field("filter_content_types", &self.filter_content_types)
            .field("allowed_content_types", &self.allowed_content_types)
            .finish_non_exhaustive()
    }
}
