//! Permission-gated node wrapper
//!
//! A `NodeWrapper` binds a node, its lineage and a caller. Actions are looked
//! up in the merged action table of the node's type:
//!
//! - an undeclared action is `UnknownAction` (NotFound)
//! - a declared action whose permission is not granted is `Forbidden`
//! - otherwise a `BoundAction` is returned that performs the mutation when called
//!
//! The permission check happens in `action()`, before any argument is looked
//! at, so a denied call never touches the store.
//!
//! # Examples
//!
//! ```rust,ignore
//! let wrapper = service.wrap(&auth, node).await?;
//! if wrapper.can("update") {
//!     wrapper.update(fields).await?;
//! }
//! ```

use crate::models::Node;
use crate::registry::TypeInformation;
use crate::security::actions::{ActionMethod, ActionSpec};
use crate::security::policy::{AuthContext, PermissionCheck};
use crate::services::{CmsError, ContentService};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Arguments of an action call, one variant per action method
#[derive(Debug, Clone, PartialEq)]
pub enum ActionArgs {
    Create {
        type_name: String,
        name: Option<String>,
        fields: Map<String, Value>,
    },
    Update {
        fields: Map<String, Value>,
    },
    Delete,
    Rename {
        name: String,
        fields: Map<String, Value>,
    },
    Share {
        principal: String,
        roles: Vec<String>,
    },
    BatchDelete {
        names: Vec<String>,
    },
}

impl ActionArgs {
    pub fn method(&self) -> ActionMethod {
        match self {
            ActionArgs::Create { .. } => ActionMethod::Create,
            ActionArgs::Update { .. } => ActionMethod::Update,
            ActionArgs::Delete => ActionMethod::Delete,
            ActionArgs::Rename { .. } => ActionMethod::Rename,
            ActionArgs::Share { .. } => ActionMethod::Share,
            ActionArgs::BatchDelete { .. } => ActionMethod::BatchDelete,
        }
    }
}

/// Result of an action call
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// Created, updated, renamed or shared node
    Node(Node),
    Deleted { uri: String },
    /// URIs removed by a batch delete
    BatchDeleted(Vec<String>),
}

impl ActionOutcome {
    pub fn into_node(self) -> Option<Node> {
        match self {
            ActionOutcome::Node(node) => Some(node),
            _ => None,
        }
    }
}

/// A node seen through the permissions of one caller
pub struct NodeWrapper<'s> {
    service: &'s ContentService,
    auth: AuthContext,
    /// The wrapped node first, then its parents
    lineage: Vec<Node>,
    tinfo: Option<Arc<TypeInformation>>,
}

impl<'s> NodeWrapper<'s> {
    pub(crate) fn new(
        service: &'s ContentService,
        auth: AuthContext,
        node: Node,
        parents: Vec<Node>,
        tinfo: Option<Arc<TypeInformation>>,
    ) -> Self {
        let mut lineage = Vec::with_capacity(parents.len() + 1);
        lineage.push(node);
        lineage.extend(parents);
        Self {
            service,
            auth,
            lineage,
            tinfo,
        }
    }

    pub fn node(&self) -> &Node {
        &self.lineage[0]
    }

    pub fn parents(&self) -> &[Node] {
        &self.lineage[1..]
    }

    pub fn lineage(&self) -> &[Node] {
        &self.lineage
    }

    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }

    pub fn type_info(&self) -> Option<&Arc<TypeInformation>> {
        self.tinfo.as_ref()
    }

    pub(crate) fn service(&self) -> &'s ContentService {
        self.service
    }

    pub fn check(&self) -> PermissionCheck<'_> {
        PermissionCheck::new(self.service.policy(), &self.auth, &self.lineage)
    }

    /// Names of the actions the caller may invoke
    pub fn actions(&self) -> Vec<&str> {
        let Some(tinfo) = &self.tinfo else {
            return Vec::new();
        };
        let check = self.check();
        tinfo
            .actions()
            .names()
            .filter(|name| {
                tinfo
                    .actions()
                    .get(name)
                    .map(|spec| check.permits(&spec.permission))
                    .unwrap_or(false)
            })
            .collect()
    }

    pub fn can(&self, name: &str) -> bool {
        self.action(name).is_ok()
    }

    /// Look up an action and check its permission
    ///
    /// # Errors
    ///
    /// - `UnknownAction` if the type does not declare `name`
    /// - `Forbidden` if the caller lacks the action's permission
    pub fn action(&self, name: &str) -> Result<BoundAction<'_, 's>, CmsError> {
        let node = self.node();
        let spec = self
            .tinfo
            .as_ref()
            .and_then(|tinfo| tinfo.actions().get(name))
            .cloned()
            .ok_or_else(|| CmsError::unknown_action(name, &node.uri))?;

        if !self.check().permits(&spec.permission) {
            tracing::debug!("Action '{}' denied on {}", name, node.uri);
            return Err(CmsError::forbidden(&spec.permission, &node.uri));
        }

        Ok(BoundAction {
            wrapper: self,
            name: name.to_string(),
            spec,
        })
    }

    pub async fn create(
        &self,
        type_name: &str,
        name: Option<&str>,
        fields: Map<String, Value>,
    ) -> Result<Node, CmsError> {
        let args = ActionArgs::Create {
            type_name: type_name.to_string(),
            name: name.map(str::to_string),
            fields,
        };
        self.call_for_node("create", args).await
    }

    pub async fn update(&self, fields: Map<String, Value>) -> Result<Node, CmsError> {
        self.call_for_node("update", ActionArgs::Update { fields })
            .await
    }

    pub async fn delete(&self) -> Result<(), CmsError> {
        self.action("delete")?.call(ActionArgs::Delete).await?;
        Ok(())
    }

    pub async fn rename(&self, name: &str, fields: Map<String, Value>) -> Result<Node, CmsError> {
        let args = ActionArgs::Rename {
            name: name.to_string(),
            fields,
        };
        self.call_for_node("rename", args).await
    }

    pub async fn share(&self, principal: &str, roles: Vec<String>) -> Result<Node, CmsError> {
        let args = ActionArgs::Share {
            principal: principal.to_string(),
            roles,
        };
        self.call_for_node("share", args).await
    }

    pub async fn batch_delete(&self, names: Vec<String>) -> Result<Vec<String>, CmsError> {
        match self
            .action("batchdelete")?
            .call(ActionArgs::BatchDelete { names })
            .await?
        {
            ActionOutcome::BatchDeleted(uris) => Ok(uris),
            _ => Err(CmsError::invalid_arguments("batchdelete")),
        }
    }

    async fn call_for_node(&self, name: &str, args: ActionArgs) -> Result<Node, CmsError> {
        self.action(name)?
            .call(args)
            .await?
            .into_node()
            .ok_or_else(|| CmsError::invalid_arguments(name))
    }
}

/// Permission-checked action ready to be called
pub struct BoundAction<'w, 's> {
    wrapper: &'w NodeWrapper<'s>,
    name: String,
    spec: ActionSpec,
}

impl<'w, 's> BoundAction<'w, 's> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec(&self) -> &ActionSpec {
        &self.spec
    }

    /// Perform the action
    ///
    /// # Errors
    ///
    /// `InvalidArguments` if `args` belong to a different method than the one
    /// the action is declared with; otherwise whatever the operation returns.
    pub async fn call(self, args: ActionArgs) -> Result<ActionOutcome, CmsError> {
        if args.method() != self.spec.method {
            return Err(CmsError::invalid_arguments(&self.name));
        }

        let service = self.wrapper.service();
        let node = self.wrapper.node();
        let outcome = match args {
            ActionArgs::Create {
                type_name,
                name,
                fields,
            } => ActionOutcome::Node(
                service
                    .do_create(
                        self.wrapper.auth(),
                        self.wrapper.lineage(),
                        &type_name,
                        name,
                        fields,
                    )
                    .await?,
            ),
            ActionArgs::Update { fields } => {
                ActionOutcome::Node(service.do_update(node, &fields).await?)
            }
            ActionArgs::Delete => {
                service.do_delete(node).await?;
                ActionOutcome::Deleted {
                    uri: node.uri.clone(),
                }
            }
            ActionArgs::Rename { name, fields } => {
                ActionOutcome::Node(service.do_rename(node, &name, &fields).await?)
            }
            ActionArgs::Share { principal, roles } => {
                ActionOutcome::Node(service.do_share(node, &principal, roles).await?)
            }
            ActionArgs::BatchDelete { names } => {
                ActionOutcome::BatchDeleted(service.do_batch_delete(node, &names).await?)
            }
        };
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::NodeKind;
    use crate::registry::RegistryBuilder;
    use crate::security::{ActionSpec, ROLE_EDITOR, VIEW};
    use serde_json::json;

    async fn setup() -> (ContentService, Node) {
        let registry = RegistryBuilder::new()
            .register_type(TypeInformation::new("folder", NodeKind::Container))
            .register_type(
                TypeInformation::new("page", NodeKind::Content)
                    .action("publish", ActionSpec::new(ActionMethod::Update)),
            )
            .build()
            .unwrap();
        let service = ContentService::new(Arc::new(MemoryStore::new()), Arc::new(registry));
        let mut root = service
            .type_info("folder")
            .unwrap()
            .create(&Map::new())
            .unwrap();
        root.content_mut().unwrap().path = "/".to_string();
        let root = service.store().insert_node(root).await.unwrap();
        (service, root)
    }

    #[tokio::test]
    async fn test_unknown_action_is_not_found() {
        let (service, root) = setup().await;
        let wrapper = service.wrap(&AuthContext::superuser(), root).await.unwrap();
        let err = wrapper.action("missing").err().unwrap();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_forbidden_before_mutation() {
        let (service, root) = setup().await;
        let anon = AuthContext::anonymous();
        let wrapper = service.wrap(&anon, root.clone()).await.unwrap();

        let fields = json!({"title": "Page"}).as_object().cloned().unwrap();
        let err = wrapper.create("page", None, fields).await.unwrap_err();
        assert!(err.is_forbidden());
        assert!(service.store().child_names(&root.uri).await.unwrap().is_empty());

        let err = wrapper.delete().await.unwrap_err();
        assert!(err.is_forbidden());
        assert!(service.store().get_node(&root.uri).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_actions_listing_follows_roles() {
        let (service, root) = setup().await;

        let anon = service.wrap(&AuthContext::anonymous(), root.clone()).await.unwrap();
        assert_eq!(anon.actions(), vec!["create"]);

        let editor = AuthContext::user("bob").with_role(ROLE_EDITOR);
        let editor = service.wrap(&editor, root).await.unwrap();
        assert!(editor.can("update"));
        assert!(editor.can("batchdelete"));
        assert!(!editor.can("share"));
    }

    #[tokio::test]
    async fn test_custom_action_and_argument_mismatch() {
        let (service, root) = setup().await;
        let auth = AuthContext::user("bob").with_role(ROLE_EDITOR);
        let fields = json!({"title": "Page"}).as_object().cloned().unwrap();
        let page = service
            .create(&auth, &root.uri, "page", None, fields)
            .await
            .unwrap();

        let anon = service.wrap(&AuthContext::anonymous(), page).await.unwrap();
        let publish = anon.action("publish").unwrap();
        assert_eq!(publish.spec().permission, VIEW);

        let err = publish.call(ActionArgs::Delete).await.unwrap_err();
        assert!(matches!(err, CmsError::InvalidArguments { .. }));

        let fields = json!({"title": "Published"}).as_object().cloned().unwrap();
        let outcome = anon
            .action("publish")
            .unwrap()
            .call(ActionArgs::Update { fields })
            .await
            .unwrap();
        assert_eq!(outcome.into_node().unwrap().title(), "Published");
    }
}
