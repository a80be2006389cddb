//! In-memory `NodeStore` used by tests, benchmarks and ephemeral sites.

use crate::db::{DatabaseError, NodeStore};
use crate::models::{Blob, Node};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MemoryState {
    nodes: HashMap<String, Node>,
    blobs: HashMap<String, Blob>,
    next_id: i64,
}

impl MemoryState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Another node already holds `(parent_uri, name)`
    fn name_taken(&self, node: &Node) -> bool {
        let Some(parent_uri) = &node.parent_uri else {
            return false;
        };
        if !node.is_content() {
            return false;
        }
        self.nodes.values().any(|other| {
            other.uri != node.uri
                && other.parent_uri.as_ref() == Some(parent_uri)
                && other.is_content()
                && other.name() == node.name()
        })
    }

    fn children_sorted(&self, parent_uri: &str) -> Vec<&Node> {
        let mut children: Vec<&Node> = self
            .nodes
            .values()
            .filter(|n| n.parent_uri.as_deref() == Some(parent_uri))
            .collect();
        children.sort_by_key(|n| n.id);
        children
    }
}

/// `NodeStore` backed by hash maps behind a tokio `RwLock`
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NodeStore for MemoryStore {
    async fn insert_node(&self, mut node: Node) -> Result<Node, DatabaseError> {
        let mut state = self.state.write().await;
        if state.nodes.contains_key(&node.uri) {
            return Err(DatabaseError::duplicate_uri(&node.uri));
        }
        if state.name_taken(&node) {
            return Err(DatabaseError::duplicate_name(
                node.parent_uri.clone().unwrap_or_default(),
                node.name(),
            ));
        }
        node.id = Some(state.allocate_id());
        state.nodes.insert(node.uri.clone(), node.clone());
        Ok(node)
    }

    async fn get_node(&self, uri: &str) -> Result<Option<Node>, DatabaseError> {
        Ok(self.state.read().await.nodes.get(uri).cloned())
    }

    async fn update_node(&self, node: &Node) -> Result<(), DatabaseError> {
        self.update_nodes(std::slice::from_ref(node)).await
    }

    async fn update_nodes(&self, nodes: &[Node]) -> Result<(), DatabaseError> {
        let mut state = self.state.write().await;

        let batch: HashSet<&str> = nodes.iter().map(|n| n.uri.as_str()).collect();
        if let Some(missing) = nodes.iter().find(|n| !state.nodes.contains_key(&n.uri)) {
            return Err(DatabaseError::record_not_found(&missing.uri));
        }

        // sibling keys after the batch: untouched nodes under the touched parents
        // plus the batch itself
        let parents: HashSet<&str> = nodes
            .iter()
            .filter_map(|n| n.parent_uri.as_deref())
            .collect();
        let mut taken: HashSet<(&str, &str)> = state
            .nodes
            .values()
            .filter(|n| n.is_content() && !batch.contains(n.uri.as_str()))
            .filter_map(|n| {
                let parent = n.parent_uri.as_deref()?;
                parents.contains(parent).then_some((parent, n.name()))
            })
            .collect();
        for node in nodes.iter().filter(|n| n.is_content()) {
            let Some(parent) = node.parent_uri.as_deref() else {
                continue;
            };
            if !taken.insert((parent, node.name())) {
                return Err(DatabaseError::duplicate_name(parent, node.name()));
            }
        }

        for node in nodes {
            let mut updated = node.clone();
            if let Some(stored) = state.nodes.get(&node.uri) {
                updated.id = stored.id;
            }
            state.nodes.insert(node.uri.clone(), updated);
        }
        Ok(())
    }

    async fn delete_node(&self, uri: &str) -> Result<bool, DatabaseError> {
        Ok(self.state.write().await.nodes.remove(uri).is_some())
    }

    async fn delete_nodes(&self, uris: &[String]) -> Result<usize, DatabaseError> {
        let mut state = self.state.write().await;
        Ok(uris
            .iter()
            .filter(|uri| state.nodes.remove(uri.as_str()).is_some())
            .count())
    }

    async fn child_names(&self, parent_uri: &str) -> Result<Vec<String>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state
            .children_sorted(parent_uri)
            .into_iter()
            .map(|n| n.name().to_string())
            .collect())
    }

    async fn children(&self, parent_uri: &str) -> Result<Vec<Node>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state
            .children_sorted(parent_uri)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn child(&self, parent_uri: &str, name: &str) -> Result<Option<Node>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state
            .children_sorted(parent_uri)
            .into_iter()
            .find(|n| n.is_content() && n.name() == name)
            .cloned())
    }

    async fn find_root(&self, type_name: &str, name: &str) -> Result<Option<Node>, DatabaseError> {
        let state = self.state.read().await;
        let mut roots: Vec<&Node> = state
            .nodes
            .values()
            .filter(|n| n.parent_uri.is_none() && n.type_name == type_name && n.name() == name)
            .collect();
        roots.sort_by_key(|n| n.id);
        Ok(roots.first().map(|n| (*n).clone()))
    }

    async fn nodes_by_type(
        &self,
        type_name: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Node>, DatabaseError> {
        let state = self.state.read().await;
        let mut nodes: Vec<&Node> = state
            .nodes
            .values()
            .filter(|n| n.type_name == type_name)
            .collect();
        nodes.sort_by_key(|n| n.id);
        Ok(nodes
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_by_type(&self, type_name: &str) -> Result<usize, DatabaseError> {
        let state = self.state.read().await;
        Ok(state
            .nodes
            .values()
            .filter(|n| n.type_name == type_name)
            .count())
    }

    async fn insert_blob(&self, mut blob: Blob) -> Result<Blob, DatabaseError> {
        let mut state = self.state.write().await;
        if state.blobs.contains_key(&blob.uri) {
            return Err(DatabaseError::duplicate_uri(&blob.uri));
        }
        blob.id = Some(state.allocate_id());
        state.blobs.insert(blob.uri.clone(), blob.clone());
        Ok(blob)
    }

    async fn get_blob(&self, uri: &str) -> Result<Option<Blob>, DatabaseError> {
        Ok(self.state.read().await.blobs.get(uri).cloned())
    }

    async fn update_blob(&self, blob: &Blob) -> Result<(), DatabaseError> {
        let mut state = self.state.write().await;
        match state.blobs.get_mut(&blob.uri) {
            Some(stored) => {
                let id = stored.id;
                *stored = blob.clone();
                stored.id = id;
                Ok(())
            }
            None => Err(DatabaseError::record_not_found(&blob.uri)),
        }
    }

    async fn delete_blob(&self, uri: &str) -> Result<bool, DatabaseError> {
        Ok(self.state.write().await.blobs.remove(uri).is_some())
    }

    async fn get_blob_by_parent(&self, parent_uri: &str) -> Result<Option<Blob>, DatabaseError> {
        let state = self.state.read().await;
        let mut blobs: Vec<&Blob> = state
            .blobs
            .values()
            .filter(|b| b.parent_uri.as_deref() == Some(parent_uri))
            .collect();
        blobs.sort_by_key(|b| b.id);
        Ok(blobs.first().map(|b| (*b).clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NodeKind;

    fn content(uri: &str, parent: Option<&str>, name: &str) -> Node {
        let mut node = Node::new(uri.to_string(), "page", NodeKind::Content);
        node.parent_uri = parent.map(str::to_string);
        node.content_mut().unwrap().name = name.to_string();
        node
    }

    #[tokio::test]
    async fn test_insert_assigns_ids_in_order() {
        let store = MemoryStore::new();
        let a = store.insert_node(content("p:a", Some("p:root"), "a")).await.unwrap();
        let b = store.insert_node(content("p:b", Some("p:root"), "b")).await.unwrap();
        assert!(a.id < b.id);
        assert_eq!(store.child_names("p:root").await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_unique_uri_and_name() {
        let store = MemoryStore::new();
        store.insert_node(content("p:a", Some("p:root"), "a")).await.unwrap();

        let err = store
            .insert_node(content("p:a", Some("p:other"), "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::DuplicateUri { .. }));

        let err = store
            .insert_node(content("p:b", Some("p:root"), "a"))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::DuplicateName { .. }));

        // roots never collide on name
        store.insert_node(content("p:r1", None, "")).await.unwrap();
        store.insert_node(content("p:r2", None, "")).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_nodes_is_all_or_nothing() {
        let store = MemoryStore::new();
        let a = store.insert_node(content("p:a", Some("p:root"), "a")).await.unwrap();
        let mut b = store.insert_node(content("p:b", Some("p:root"), "b")).await.unwrap();

        let mut renamed = a.clone();
        renamed.content_mut().unwrap().title = "changed".to_string();
        b.content_mut().unwrap().name = "a".to_string();

        let err = store.update_nodes(&[renamed, b]).await.unwrap_err();
        assert!(matches!(err, DatabaseError::DuplicateName { .. }));
        assert_eq!(store.get_node("p:a").await.unwrap().unwrap().title(), "");

        let err = store
            .update_node(&content("p:missing", None, ""))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::RecordNotFound { .. }));
    }

    #[tokio::test]
    async fn test_swap_names_in_one_batch() {
        let store = MemoryStore::new();
        let mut a = store.insert_node(content("p:a", Some("p:root"), "a")).await.unwrap();
        let mut b = store.insert_node(content("p:b", Some("p:root"), "b")).await.unwrap();
        a.content_mut().unwrap().name = "b".to_string();
        b.content_mut().unwrap().name = "a".to_string();

        store.update_nodes(&[a, b]).await.unwrap();
        let child = store.child("p:root", "a").await.unwrap().unwrap();
        assert_eq!(child.uri, "p:b");
    }

    #[tokio::test]
    async fn test_batch_move_checks_new_siblings() {
        let store = MemoryStore::new();
        store.insert_node(content("p:x", Some("p:other"), "a")).await.unwrap();
        let mut a = store.insert_node(content("p:a", Some("p:root"), "a")).await.unwrap();
        a.parent_uri = Some("p:other".to_string());

        let err = store.update_nodes(&[a.clone()]).await.unwrap_err();
        assert!(matches!(err, DatabaseError::DuplicateName { .. }));
        let stored = store.get_node("p:a").await.unwrap().unwrap();
        assert_eq!(stored.parent_uri.as_deref(), Some("p:root"));

        a.content_mut().unwrap().name = "b".to_string();
        store.update_nodes(&[a]).await.unwrap();
        assert_eq!(store.child_names("p:other").await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_delete_nodes_removes_listed_only() {
        let store = MemoryStore::new();
        store.insert_node(content("p:f", Some("p:root"), "f")).await.unwrap();
        store.insert_node(content("p:c", Some("p:f"), "c")).await.unwrap();
        store.insert_node(content("p:keep", Some("p:root"), "keep")).await.unwrap();

        let uris = vec!["p:c".to_string(), "p:f".to_string(), "p:gone".to_string()];
        assert_eq!(store.delete_nodes(&uris).await.unwrap(), 2);
        assert!(store.get_node("p:f").await.unwrap().is_none());
        assert!(store.get_node("p:c").await.unwrap().is_none());
        assert_eq!(store.child_names("p:root").await.unwrap(), vec!["keep"]);
    }

    #[tokio::test]
    async fn test_type_listing() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .insert_node(content(&format!("p:{i}"), Some("p:root"), &format!("n{i}")))
                .await
                .unwrap();
        }
        assert_eq!(store.count_by_type("page").await.unwrap(), 5);
        let page: Vec<_> = store
            .nodes_by_type("page", 2, 2)
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.uri)
            .collect();
        assert_eq!(page, vec!["p:2", "p:3"]);
    }

    #[tokio::test]
    async fn test_blobs() {
        let store = MemoryStore::new();
        let mut blob = Blob::new("blob-sql:1".to_string());
        blob.parent_uri = Some("p:a".to_string());
        blob.write(b"data".to_vec());
        let mut blob = store.insert_blob(blob).await.unwrap();

        let found = store.get_blob_by_parent("p:a").await.unwrap().unwrap();
        assert_eq!(found.read(), Some(&b"data"[..]));

        blob.write(b"new data".to_vec());
        store.update_blob(&blob).await.unwrap();
        let found = store.get_blob("blob-sql:1").await.unwrap().unwrap();
        assert_eq!(found.size, 8);

        assert!(store.delete_blob("blob-sql:1").await.unwrap());
        assert!(store.get_blob("blob-sql:1").await.unwrap().is_none());
    }
}
