//! Container mapping view
//!
//! `ContainerRef` exposes a container's children as a mapping from name to
//! node. Children are found by querying the store on `parent_uri`, so the view
//! never goes stale.

use crate::models::Node;
use crate::services::content_service::ContentService;
use crate::services::error::CmsError;
use crate::services::events::ContentEvent;

/// Mapping operations over the children of one container
pub struct ContainerRef<'s> {
    service: &'s ContentService,
    node: Node,
}

impl<'s> ContainerRef<'s> {
    pub(crate) fn new(service: &'s ContentService, node: Node) -> Self {
        Self { service, node }
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn into_node(self) -> Node {
        self.node
    }

    /// Child names in insertion order
    pub async fn keys(&self) -> Result<Vec<String>, CmsError> {
        Ok(self.service.store().child_names(&self.node.uri).await?)
    }

    /// Content children in insertion order
    pub async fn values(&self) -> Result<Vec<Node>, CmsError> {
        let children = self.service.store().children(&self.node.uri).await?;
        Ok(children.into_iter().filter(Node::is_content).collect())
    }

    pub async fn items(&self) -> Result<Vec<(String, Node)>, CmsError> {
        Ok(self
            .values()
            .await?
            .into_iter()
            .map(|node| (node.name().to_string(), node))
            .collect())
    }

    pub async fn get(&self, key: &str) -> Result<Option<Node>, CmsError> {
        Ok(self.service.store().child(&self.node.uri, key).await?)
    }

    /// Child by name, `NotFound` when missing
    pub async fn get_item(&self, key: &str) -> Result<Node, CmsError> {
        self.get(key)
            .await?
            .ok_or_else(|| CmsError::not_found(format!("{}{}", self.node.path(), key)))
    }

    pub async fn contains(&self, key: &str) -> Result<bool, CmsError> {
        Ok(self.get(key).await?.is_some())
    }

    /// Place `item` under `key` and notify `Added` or `Moved`
    ///
    /// Returns the stored item with its new name, parent and path.
    pub async fn set_item(&self, key: &str, item: Node) -> Result<Node, CmsError> {
        let (item, event) = self.attach(key, item).await?;
        self.service.notify(event);
        Ok(item)
    }

    /// Place `item` under `key` without notifying hooks
    ///
    /// # Errors
    ///
    /// - `NotContent` if the item is a bare node
    /// - `SelfContainment` if the item is this container or one of its parents
    /// - `NameInUse` if `key` is taken
    ///
    /// Descendant paths of a moved container are rewritten in the same store
    /// batch as the item itself.
    pub(crate) async fn attach(
        &self,
        key: &str,
        mut item: Node,
    ) -> Result<(Node, ContentEvent), CmsError> {
        if !item.is_content() {
            return Err(CmsError::not_content(&item.uri));
        }
        if item.uri == self.node.uri {
            return Err(CmsError::self_containment(
                &item.uri,
                &self.node.uri,
                "Can't set to it self",
            ));
        }
        let parents = self.service.load_parents(&self.node).await?;
        if parents.iter().any(|parent| parent.uri == item.uri) {
            return Err(CmsError::self_containment(
                &item.uri,
                &self.node.uri,
                "Can't use parent as a child",
            ));
        }
        if self.contains(key).await? {
            return Err(CmsError::name_in_use(key));
        }

        let added = item.parent_uri.is_none();
        item.parent_uri = Some(self.node.uri.clone());
        let content = item.content_mut()?;
        content.name = key.to_string();
        content.path = format!("{}{}/", self.node.path(), key);

        let stored = if item.is_persisted() {
            let mut batch = vec![item.clone()];
            if item.is_container() {
                batch.extend(self.service.rewrite_paths(&item).await?);
            }
            self.service.store().update_nodes(&batch).await?;
            item
        } else {
            self.service.store().insert_node(item).await?
        };

        let event = if added {
            ContentEvent::Added(stored.clone())
        } else {
            ContentEvent::Moved(stored.clone())
        };
        Ok((stored, event))
    }

    /// Remove the child under `key` together with its subtree
    pub async fn del_item(&self, key: &str) -> Result<(), CmsError> {
        let item = self.get_item(key).await?;
        self.service.delete_subtree(item).await
    }
}
