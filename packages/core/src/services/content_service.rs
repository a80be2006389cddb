//! Content Service - Content Tree Operations
//!
//! This module provides the business logic layer for the content tree:
//!
//! - Lookup (URI resolution, permission-checked loading, parent lineage)
//! - Permission-gated actions (create, update, delete, rename, share, batch delete)
//! - Container mapping views and filtered listings
//!
//! # Architecture
//!
//! Every mutating entry point goes through a `NodeWrapper`, which checks the
//! action's permission before anything is written. The `do_*` methods below are
//! the unchecked implementations the wrapper dispatches to; they are crate
//! private so callers cannot bypass the gate.
//!
//! Lifecycle hooks are invoked synchronously after the store write that caused
//! the event (`Deleting` fires before its removal).
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use ptahcms_core::db::MemoryStore;
//! use ptahcms_core::models::NodeKind;
//! use ptahcms_core::registry::{RegistryBuilder, TypeInformation};
//! use ptahcms_core::security::AuthContext;
//! use ptahcms_core::services::{ApplicationFactory, ContentService};
//! use serde_json::{json, Map};
//!
//! # tokio_test::block_on(async {
//! let registry = RegistryBuilder::new()
//!     .register_type(TypeInformation::new(
//!         "site",
//!         NodeKind::ApplicationRoot { root_path: "/".to_string() },
//!     ))
//!     .register_type(TypeInformation::new("page", NodeKind::Content))
//!     .register_application(ApplicationFactory::new("/", "root", "Site", "site"))
//!     .build()
//!     .unwrap();
//! let service = ContentService::new(Arc::new(MemoryStore::new()), Arc::new(registry));
//!
//! let root = service.registry().app_factory("root").unwrap().root(&service).await.unwrap();
//! let fields = json!({"title": "Welcome"}).as_object().cloned().unwrap();
//! let page = service
//!     .create(&AuthContext::superuser(), &root.uri, "page", None, fields)
//!     .await
//!     .unwrap();
//!
//! assert_eq!(page.name(), "welcome");
//! # });
//! ```

use crate::config::CmsSettings;
use crate::db::NodeStore;
use crate::models::{Node, NodeKind};
use crate::registry::{Registry, Resolved, TypeInformation};
use crate::security::{
    AuthContext, LocalRolesPolicy, NodeWrapper, Permission, PermissionCheck, SecurityPolicy,
    SHAREABLE_ROLES, VIEW,
};
use crate::services::blob_storage::BlobStorage;
use crate::services::container::ContainerRef;
use crate::services::error::CmsError;
use crate::services::events::{ContentEvent, ContentHook};
use crate::utils::{choose_name, normalize_name};
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

/// Content tree service
///
/// Cheap to clone; all state lives behind `Arc`s.
#[derive(Clone)]
pub struct ContentService {
    store: Arc<dyn NodeStore>,
    registry: Arc<Registry>,
    policy: Arc<dyn SecurityPolicy>,
    settings: Arc<CmsSettings>,
    hooks: Vec<Arc<dyn ContentHook>>,
}

impl ContentService {
    /// Service with the default `LocalRolesPolicy` and default settings
    pub fn new(store: Arc<dyn NodeStore>, registry: Arc<Registry>) -> Self {
        Self {
            store,
            registry,
            policy: Arc::new(LocalRolesPolicy::default()),
            settings: Arc::new(CmsSettings::default()),
            hooks: Vec::new(),
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn SecurityPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_settings(mut self, settings: CmsSettings) -> Self {
        self.settings = Arc::new(settings);
        self
    }

    /// Register a lifecycle hook; hooks run in registration order
    pub fn with_hook(mut self, hook: Arc<dyn ContentHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn store(&self) -> &dyn NodeStore {
        self.store.as_ref()
    }

    /// Blob storage sharing this service's store
    pub fn blob_storage(&self) -> BlobStorage {
        BlobStorage::new(Arc::clone(&self.store))
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn policy(&self) -> &dyn SecurityPolicy {
        self.policy.as_ref()
    }

    pub fn settings(&self) -> &CmsSettings {
        &self.settings
    }

    pub(crate) fn notify(&self, event: ContentEvent) {
        tracing::debug!(event = event.event_type(), uri = event.uri(), "Content event");
        for hook in &self.hooks {
            hook.on_event(&event);
        }
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Resolve any registered URI
    pub async fn resolve(&self, uri: &str) -> Result<Option<Resolved>, CmsError> {
        Ok(self.registry.resolve(uri, self.store()).await?)
    }

    /// Stored node by URI, `NotFound` when missing
    pub async fn get_node(&self, uri: &str) -> Result<Node, CmsError> {
        self.store
            .get_node(uri)
            .await?
            .ok_or_else(|| CmsError::not_found(uri))
    }

    /// Load a node by URI, optionally requiring a permission on it
    ///
    /// # Errors
    ///
    /// - `NotFound` if the URI does not resolve to a node
    /// - `Forbidden` if `permission` is given and not granted
    pub async fn load(
        &self,
        auth: &AuthContext,
        uri: &str,
        permission: Option<&Permission>,
    ) -> Result<Node, CmsError> {
        let node = self
            .resolve(uri)
            .await?
            .and_then(Resolved::into_node)
            .ok_or_else(|| CmsError::not_found(uri))?;

        if let Some(permission) = permission {
            let lineage = self.lineage(node.clone()).await?;
            if !self.check_permission(auth, &lineage, permission) {
                return Err(CmsError::forbidden(permission, uri));
            }
        }
        Ok(node)
    }

    /// Parents of a node, nearest first
    ///
    /// Stops at the first missing parent. A parent chain that loops back on
    /// itself is cut at the repeated node.
    pub async fn load_parents(&self, node: &Node) -> Result<Vec<Node>, CmsError> {
        let mut parents = Vec::new();
        let mut visited: HashSet<String> = HashSet::from([node.uri.clone()]);
        let mut next = node.parent_uri.clone();

        while let Some(uri) = next {
            if !visited.insert(uri.clone()) {
                tracing::warn!("Parent cycle detected at {}", uri);
                break;
            }
            let Some(parent) = self.store.get_node(&uri).await? else {
                break;
            };
            next = parent.parent_uri.clone();
            parents.push(parent);
        }
        Ok(parents)
    }

    /// The node followed by its parents
    pub async fn lineage(&self, node: Node) -> Result<Vec<Node>, CmsError> {
        let parents = self.load_parents(&node).await?;
        let mut lineage = Vec::with_capacity(parents.len() + 1);
        lineage.push(node);
        lineage.extend(parents);
        Ok(lineage)
    }

    pub fn check_permission(
        &self,
        auth: &AuthContext,
        lineage: &[Node],
        permission: &Permission,
    ) -> bool {
        PermissionCheck::new(self.policy(), auth, lineage).permits(permission)
    }

    /// Registered type by name or `type:<name>` URI
    pub fn type_info(&self, name: &str) -> Result<Arc<TypeInformation>, CmsError> {
        let name = name.strip_prefix("type:").unwrap_or(name);
        self.registry
            .get_type(name)
            .cloned()
            .ok_or_else(|| CmsError::unknown_type(name))
    }

    /// Types the caller may create inside a container
    pub async fn list_types(
        &self,
        auth: &AuthContext,
        container: &Node,
    ) -> Result<Vec<Arc<TypeInformation>>, CmsError> {
        let Some(tinfo) = self.registry.get_type(&container.type_name) else {
            return Ok(Vec::new());
        };
        let lineage = self.lineage(container.clone()).await?;
        let check = PermissionCheck::new(self.policy(), auth, &lineage);
        Ok(tinfo.list_types(&check, &self.registry))
    }

    /// Wrap a node for permission-gated actions
    pub async fn wrap(&self, auth: &AuthContext, node: Node) -> Result<NodeWrapper<'_>, CmsError> {
        let tinfo = self.registry.get_type(&node.type_name).cloned();
        let parents = self.load_parents(&node).await?;
        Ok(NodeWrapper::new(self, auth.clone(), node, parents, tinfo))
    }

    /// Wrap the node behind a URI
    ///
    /// # Errors
    ///
    /// `NotFound` when no URI is given or it does not resolve to a node.
    pub async fn wrap_uri(
        &self,
        auth: &AuthContext,
        uri: Option<&str>,
    ) -> Result<NodeWrapper<'_>, CmsError> {
        let uri = uri.ok_or_else(|| CmsError::not_found("empty uri"))?;
        let node = self
            .resolve(uri)
            .await?
            .and_then(Resolved::into_node)
            .ok_or_else(|| CmsError::not_found(uri))?;
        self.wrap(auth, node).await
    }

    /// Mapping view over a container's children
    pub fn container(&self, node: Node) -> Result<ContainerRef<'_>, CmsError> {
        if !node.is_container() {
            return Err(CmsError::not_container(&node.uri));
        }
        Ok(ContainerRef::new(self, node))
    }

    /// Children of a container that are public or viewable by the caller
    pub async fn contents(&self, auth: &AuthContext, container: &Node) -> Result<Vec<Node>, CmsError> {
        let container = self.container(container.clone())?;
        let mut lineage = self.lineage(container.node().clone()).await?;
        let mut visible = Vec::new();

        for child in container.values().await? {
            let public = child.content.as_ref().map(|c| c.public).unwrap_or(false);
            lineage.insert(0, child);
            if public || self.check_permission(auth, &lineage, &VIEW) {
                visible.push(lineage.remove(0));
            } else {
                lineage.remove(0);
            }
        }
        Ok(visible)
    }

    // ------------------------------------------------------------------
    // Permission-gated shortcuts
    // ------------------------------------------------------------------

    pub async fn create(
        &self,
        auth: &AuthContext,
        container_uri: &str,
        type_name: &str,
        name: Option<&str>,
        fields: Map<String, Value>,
    ) -> Result<Node, CmsError> {
        self.wrap_uri(auth, Some(container_uri))
            .await?
            .create(type_name, name, fields)
            .await
    }

    pub async fn update(
        &self,
        auth: &AuthContext,
        uri: &str,
        fields: Map<String, Value>,
    ) -> Result<Node, CmsError> {
        self.wrap_uri(auth, Some(uri)).await?.update(fields).await
    }

    pub async fn delete(&self, auth: &AuthContext, uri: &str) -> Result<(), CmsError> {
        self.wrap_uri(auth, Some(uri)).await?.delete().await
    }

    pub async fn rename(
        &self,
        auth: &AuthContext,
        uri: &str,
        name: &str,
        fields: Map<String, Value>,
    ) -> Result<Node, CmsError> {
        self.wrap_uri(auth, Some(uri))
            .await?
            .rename(name, fields)
            .await
    }

    pub async fn share(
        &self,
        auth: &AuthContext,
        uri: &str,
        principal: &str,
        roles: Vec<String>,
    ) -> Result<Node, CmsError> {
        self.wrap_uri(auth, Some(uri))
            .await?
            .share(principal, roles)
            .await
    }

    pub async fn batch_delete(
        &self,
        auth: &AuthContext,
        container_uri: &str,
        names: Vec<String>,
    ) -> Result<Vec<String>, CmsError> {
        self.wrap_uri(auth, Some(container_uri))
            .await?
            .batch_delete(names)
            .await
    }

    // ------------------------------------------------------------------
    // Action implementations (called through NodeWrapper only)
    // ------------------------------------------------------------------

    /// Create content of `type_name` inside `lineage[0]`
    ///
    /// Field values are applied before the node is stored, so a rejected value
    /// leaves the container untouched. Event order: `Created`, `Added`.
    pub(crate) async fn do_create(
        &self,
        auth: &AuthContext,
        lineage: &[Node],
        type_name: &str,
        name: Option<String>,
        fields: Map<String, Value>,
    ) -> Result<Node, CmsError> {
        let tinfo = self.type_info(type_name)?;
        let check = PermissionCheck::new(self.policy(), auth, lineage);
        tinfo.check_context(&check, &self.registry)?;

        let container = lineage
            .first()
            .cloned()
            .ok_or_else(|| CmsError::not_found("container"))?;
        let container = self.container(container)?;
        let existing = container.keys().await?;

        let name = match name.filter(|name| !name.is_empty()) {
            Some(name) => {
                validate_name(&name)?;
                if existing.contains(&name) {
                    return Err(CmsError::name_in_use(name));
                }
                name
            }
            None => {
                let title = fields
                    .get("title")
                    .and_then(Value::as_str)
                    .filter(|title| !normalize_name(title).is_empty())
                    .unwrap_or(tinfo.name.as_str());
                choose_name(title, &tinfo.name_suffix, &existing)
            }
        };

        let mut node = tinfo.create(&Map::new())?;
        let now = Utc::now();
        node.owner = auth.userid.clone();
        if let Some(content) = node.content.as_mut() {
            content.created = Some(now);
            content.modified = Some(now);
            content.lang = self.settings.default_lang.clone();
        }
        self.apply_fields(&mut node, &fields)?;

        let (node, placed) = container.attach(&name, node).await?;
        tracing::info!("Created {} '{}' in {}", tinfo.name, name, container.node().uri);
        self.notify(ContentEvent::Created(node.clone()));
        self.notify(placed);
        Ok(node)
    }

    /// Apply fieldset values; absent fields fall back to their declared default
    pub(crate) async fn do_update(
        &self,
        node: &Node,
        fields: &Map<String, Value>,
    ) -> Result<Node, CmsError> {
        let mut node = self.get_node(&node.uri).await?;
        self.apply_fields(&mut node, fields)?;
        if let Some(content) = node.content.as_mut() {
            content.modified = Some(Utc::now());
        }

        self.store.update_node(&node).await?;
        self.notify(ContentEvent::Modified(node.clone()));
        Ok(node)
    }

    /// Set every fieldset value on `node` without writing it
    fn apply_fields(&self, node: &mut Node, fields: &Map<String, Value>) -> Result<(), CmsError> {
        let Some(tinfo) = self.registry.get_type(&node.type_name) else {
            return Ok(());
        };
        for field in tinfo.fieldset.fields() {
            let value = fields
                .get(&field.name)
                .cloned()
                .or_else(|| field.default.clone());
            if let Some(value) = value.filter(|v| !v.is_null()) {
                node.set_field(&field.name, value)?;
            }
        }
        Ok(())
    }

    pub(crate) async fn do_delete(&self, node: &Node) -> Result<(), CmsError> {
        if node.is_root() {
            return Err(CmsError::root_protected("deleted", &node.uri));
        }
        let parent_uri = node
            .parent_uri
            .as_deref()
            .ok_or_else(|| CmsError::parent_missing(&node.uri))?;
        let parent = self
            .store
            .get_node(parent_uri)
            .await?
            .ok_or_else(|| CmsError::parent_missing(&node.uri))?;

        self.container(parent)?.del_item(node.name()).await
    }

    /// Rename within the current parent, then apply any field values
    pub(crate) async fn do_rename(
        &self,
        node: &Node,
        name: &str,
        fields: &Map<String, Value>,
    ) -> Result<Node, CmsError> {
        if node.is_root() {
            return Err(CmsError::root_protected("renamed", &node.uri));
        }
        let mut current = self.get_node(&node.uri).await?;

        if current.name() != name {
            validate_name(name)?;
            let parent_uri = current
                .parent_uri
                .clone()
                .ok_or_else(|| CmsError::parent_missing(&current.uri))?;
            let parent = self
                .store
                .get_node(&parent_uri)
                .await?
                .ok_or_else(|| CmsError::parent_missing(&current.uri))?;

            let old_name = current.name().to_string();
            current = self.container(parent)?.set_item(name, current).await?;
            tracing::info!("Renamed {} from '{}' to '{}'", current.uri, old_name, name);
        }

        if fields.is_empty() {
            Ok(current)
        } else {
            self.do_update(&current, fields).await
        }
    }

    /// Grant local roles to a principal; an empty role list revokes them
    pub(crate) async fn do_share(
        &self,
        node: &Node,
        principal: &str,
        roles: Vec<String>,
    ) -> Result<Node, CmsError> {
        if roles
            .iter()
            .any(|role| !SHAREABLE_ROLES.contains(&role.as_str()))
        {
            return Err(CmsError::invalid_arguments("share"));
        }

        let mut node = self.get_node(&node.uri).await?;
        if roles.is_empty() {
            node.local_roles.remove(principal);
        } else {
            node.local_roles.insert(principal.to_string(), roles);
        }

        self.store.update_node(&node).await?;
        self.notify(ContentEvent::Modified(node.clone()));
        Ok(node)
    }

    /// Delete several children of a container
    ///
    /// All names are looked up before anything is removed, so an unknown name
    /// leaves the container untouched.
    pub(crate) async fn do_batch_delete(
        &self,
        container: &Node,
        names: &[String],
    ) -> Result<Vec<String>, CmsError> {
        let container = self.container(self.get_node(&container.uri).await?)?;

        let mut items = Vec::with_capacity(names.len());
        for name in names {
            items.push(container.get_item(name).await?);
        }

        let mut deleted = Vec::with_capacity(items.len());
        for item in items {
            let uri = item.uri.clone();
            self.delete_subtree(item).await?;
            deleted.push(uri);
        }
        Ok(deleted)
    }

    // ------------------------------------------------------------------
    // Subtree maintenance
    // ------------------------------------------------------------------

    /// Descendants of `node` with their paths recomputed from `node.path`
    ///
    /// Nothing is written; the caller commits the result together with `node`.
    pub(crate) async fn rewrite_paths(&self, node: &Node) -> Result<Vec<Node>, CmsError> {
        let mut rewritten = Vec::new();
        let mut stack = vec![(node.uri.clone(), node.path().to_string())];

        while let Some((parent_uri, parent_path)) = stack.pop() {
            for mut child in self.store.children(&parent_uri).await? {
                let Some(content) = child.content.as_mut() else {
                    continue;
                };
                content.path = format!("{}{}/", parent_path, content.name);
                if child.is_container() {
                    stack.push((child.uri.clone(), child.path().to_string()));
                }
                rewritten.push(child);
            }
        }
        Ok(rewritten)
    }

    /// Remove a node and everything below it, children first
    ///
    /// Every `Deleting` event fires before the single store batch and every
    /// `Deleted` event after it.
    pub(crate) async fn delete_subtree(&self, node: Node) -> Result<(), CmsError> {
        let top = node.uri.clone();
        let mut ordered = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            stack.extend(self.store.children(&current.uri).await?);
            ordered.push(current);
        }
        ordered.reverse();

        let uris: Vec<String> = ordered.iter().map(|item| item.uri.clone()).collect();
        for item in ordered {
            self.notify(ContentEvent::Deleting(item));
        }
        let removed = self.store.delete_nodes(&uris).await?;
        tracing::info!("Deleted {} ({} nodes)", top, removed);
        for uri in uris {
            self.notify(ContentEvent::Deleted { uri });
        }
        Ok(())
    }

    /// Kind assigned to application roots mounted at `root_path`
    pub(crate) fn root_kind(root_path: &str) -> NodeKind {
        NodeKind::ApplicationRoot {
            root_path: root_path.to_string(),
        }
    }
}

/// Reject names that can never be valid container keys
fn validate_name(name: &str) -> Result<(), CmsError> {
    if name.contains('/') {
        return Err(CmsError::invalid_name(name, "Names cannot contain '/'"));
    }
    if name.starts_with(char::is_whitespace) {
        return Err(CmsError::invalid_name(name, "Names cannot start with whitespace"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::registry::RegistryBuilder;
    use crate::security::{RoleMap, ROLE_MANAGER};
    use crate::services::ApplicationFactory;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl ContentHook for Recorder {
        fn on_event(&self, event: &ContentEvent) {
            self.events
                .lock()
                .unwrap()
                .push(event.event_type().to_string());
        }
    }

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    async fn setup() -> (ContentService, Node, Arc<Recorder>) {
        let registry = RegistryBuilder::new()
            .register_type(TypeInformation::new(
                "site",
                NodeKind::ApplicationRoot {
                    root_path: "/".to_string(),
                },
            ))
            .register_type(TypeInformation::new("folder", NodeKind::Container))
            .register_type(TypeInformation::new("page", NodeKind::Content))
            .register_application(ApplicationFactory::new("/", "root", "Root", "site"))
            .build()
            .unwrap();
        let recorder = Arc::new(Recorder::default());
        let service = ContentService::new(Arc::new(MemoryStore::new()), Arc::new(registry))
            .with_hook(recorder.clone());
        let root = service
            .registry()
            .app_factory("root")
            .unwrap()
            .root(&service)
            .await
            .unwrap();
        recorder.events.lock().unwrap().clear();
        (service, root, recorder)
    }

    #[tokio::test]
    async fn test_create_sets_metadata_and_fires_events() {
        let (service, root, recorder) = setup().await;
        let auth = AuthContext::superuser();

        let page = service
            .create(&auth, &root.uri, "page", None, fields(json!({"title": "Test"})))
            .await
            .unwrap();

        assert_eq!(page.name(), "test");
        assert_eq!(page.path(), format!("{}test/", root.path()));
        assert_eq!(page.owner, auth.userid);
        assert!(page.content().unwrap().created.is_some());
        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec!["created", "added"]
        );
    }

    #[tokio::test]
    async fn test_rejected_field_leaves_container_untouched() {
        let (service, root, recorder) = setup().await;
        let auth = AuthContext::superuser();

        let err = service
            .create(&auth, &root.uri, "page", Some("hello"), fields(json!({"title": 42})))
            .await
            .unwrap_err();
        assert!(matches!(err, CmsError::Validation(_)));

        let container = service.container(root.clone()).unwrap();
        assert!(container.keys().await.unwrap().is_empty());
        assert!(recorder.events.lock().unwrap().is_empty());

        let page = service
            .create(&auth, &root.uri, "page", Some("hello"), fields(json!({"title": "Hello"})))
            .await
            .unwrap();
        assert_eq!(page.title(), "Hello");
    }

    #[tokio::test]
    async fn test_create_name_checks() {
        let (service, root, _) = setup().await;
        let auth = AuthContext::superuser();
        let data = fields(json!({"title": "Test"}));

        let err = service
            .create(&auth, &root.uri, "page", Some("a/b"), data.clone())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Names cannot contain '/'");

        let err = service
            .create(&auth, &root.uri, "page", Some(" x"), data.clone())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Names cannot start with whitespace");

        let err = service
            .create(&auth, &root.uri, "page", Some("\tx"), data.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, CmsError::InvalidName { .. }));

        let page = service
            .create(&auth, &root.uri, "page", Some(""), data.clone())
            .await
            .unwrap();
        assert_eq!(page.name(), "test");

        service
            .create(&auth, &root.uri, "page", Some("x"), data.clone())
            .await
            .unwrap();
        let err = service
            .create(&auth, &root.uri, "page", Some("x"), data)
            .await
            .unwrap_err();
        assert!(matches!(err, CmsError::NameInUse { .. }));
    }

    #[tokio::test]
    async fn test_create_unknown_type() {
        let (service, root, _) = setup().await;
        let err = service
            .create(&AuthContext::superuser(), &root.uri, "missing", None, Map::new())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_auto_name_falls_back_to_type_name() {
        let (service, root, _) = setup().await;
        let page = service
            .create(&AuthContext::superuser(), &root.uri, "page", None, fields(json!({"title": "???"})))
            .await
            .unwrap();
        assert_eq!(page.name(), "page");
    }

    #[tokio::test]
    async fn test_rename_rewrites_descendant_paths() {
        let (service, root, _) = setup().await;
        let auth = AuthContext::superuser();
        let folder = service
            .create(&auth, &root.uri, "folder", Some("folder"), fields(json!({"title": "F"})))
            .await
            .unwrap();
        let sub = service
            .create(&auth, &folder.uri, "folder", Some("sub"), fields(json!({"title": "S"})))
            .await
            .unwrap();
        let page = service
            .create(&auth, &sub.uri, "page", Some("page"), fields(json!({"title": "P"})))
            .await
            .unwrap();

        let renamed = service
            .rename(&auth, &folder.uri, "renamed", Map::new())
            .await
            .unwrap();
        assert_eq!(renamed.path(), format!("{}renamed/", root.path()));

        let page = service.get_node(&page.uri).await.unwrap();
        assert_eq!(page.path(), format!("{}renamed/sub/page/", root.path()));
    }

    #[tokio::test]
    async fn test_root_is_protected() {
        let (service, root, _) = setup().await;
        let auth = AuthContext::superuser();
        let err = service.delete(&auth, &root.uri).await.unwrap_err();
        assert!(matches!(err, CmsError::RootProtected { .. }));
        let err = service
            .rename(&auth, &root.uri, "other", Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CmsError::RootProtected { .. }));
    }

    #[tokio::test]
    async fn test_delete_cascades_children_first() {
        let (service, root, recorder) = setup().await;
        let auth = AuthContext::superuser();
        let folder = service
            .create(&auth, &root.uri, "folder", Some("folder"), fields(json!({"title": "F"})))
            .await
            .unwrap();
        let page = service
            .create(&auth, &folder.uri, "page", Some("page"), fields(json!({"title": "P"})))
            .await
            .unwrap();
        recorder.events.lock().unwrap().clear();

        service.delete(&auth, &folder.uri).await.unwrap();

        assert!(service.store().get_node(&page.uri).await.unwrap().is_none());
        assert!(service.store().get_node(&folder.uri).await.unwrap().is_none());
        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec!["deleting", "deleting", "deleted", "deleted"]
        );
    }

    #[tokio::test]
    async fn test_share_validates_roles() {
        let (service, root, _) = setup().await;
        let auth = AuthContext::superuser();
        let page = service
            .create(&auth, &root.uri, "page", None, fields(json!({"title": "P"})))
            .await
            .unwrap();

        let shared = service
            .share(&auth, &page.uri, "bob", vec!["role:Editor".to_string()])
            .await
            .unwrap();
        assert_eq!(shared.local_roles["bob"], vec!["role:Editor"]);

        let err = service
            .share(&auth, &page.uri, "bob", vec!["role:Owner".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, CmsError::InvalidArguments { .. }));

        let revoked = service.share(&auth, &page.uri, "bob", Vec::new()).await.unwrap();
        assert!(revoked.local_roles.is_empty());
    }

    #[tokio::test]
    async fn test_contents_filters_by_view() {
        let (service, root, _) = setup().await;
        let policy = LocalRolesPolicy::default()
            .with_acl_map("private", RoleMap::new().allow(ROLE_MANAGER, &[VIEW]));
        let service = service.with_policy(Arc::new(policy));
        let auth = AuthContext::superuser();
        let mut hidden = service
            .create(&auth, &root.uri, "page", Some("hidden"), fields(json!({"title": "H"})))
            .await
            .unwrap();
        hidden.acls = vec!["private".to_string()];
        service.store().update_node(&hidden).await.unwrap();
        service
            .create(&auth, &root.uri, "page", Some("visible"), fields(json!({"title": "V"})))
            .await
            .unwrap();

        let names: Vec<String> = service
            .contents(&AuthContext::anonymous(), &root)
            .await
            .unwrap()
            .iter()
            .map(|n| n.name().to_string())
            .collect();
        assert_eq!(names, vec!["visible"]);
    }

    #[tokio::test]
    async fn test_load_with_permission() {
        let (service, root, _) = setup().await;
        let anon = AuthContext::anonymous();

        assert!(service.load(&anon, &root.uri, None).await.is_ok());
        assert!(service.load(&anon, "type-page:missing", None).await.unwrap_err().is_not_found());

        let err = service
            .load(&anon, &root.uri, Some(&crate::security::ADD_CONTENT))
            .await
            .unwrap_err();
        assert!(err.is_forbidden());
    }
}
