//! Application roots
//!
//! An `ApplicationFactory` mounts a content tree at a URL path. The root node
//! is found by its type and name, and created on first use.

use crate::models::Node;
use crate::services::content_service::ContentService;
use crate::services::error::CmsError;
use crate::services::events::ContentEvent;
use chrono::Utc;
use serde_json::Map;

/// Mount point of an application root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationFactory {
    /// Mount path, always starting and ending with `/`
    pub path: String,
    /// Root name, unique per root type
    pub name: String,
    pub title: String,
    /// Registered type of the root, must be an application root kind
    pub type_name: String,
}

impl ApplicationFactory {
    pub fn new(
        path: &str,
        name: impl Into<String>,
        title: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        let trimmed = path.trim_matches('/');
        let path = if trimmed.is_empty() {
            "/".to_string()
        } else {
            format!("/{}/", trimmed)
        };
        Self {
            path,
            name: name.into(),
            title: title.into(),
            type_name: type_name.into(),
        }
    }

    /// Find or create the root node
    ///
    /// A stored root whose mount point differs from `path` is updated to the
    /// current mount.
    pub async fn root(&self, service: &ContentService) -> Result<Node, CmsError> {
        let store = service.store();

        if let Some(mut root) = store.find_root(&self.type_name, &self.name).await? {
            if root.root_path() != Some(self.path.as_str()) {
                root.kind = ContentService::root_kind(&self.path);
                store.update_node(&root).await?;
            }
            return Ok(root);
        }

        let tinfo = service.type_info(&self.type_name)?;
        if !tinfo.kind.is_root() {
            return Err(CmsError::configuration(format!(
                "Type '{}' is not an application root",
                tinfo.name
            )));
        }

        let mut root = tinfo.create(&Map::new())?;
        root.kind = ContentService::root_kind(&self.path);
        let now = Utc::now();
        let path = format!("/{}/", root.uri);
        let content = root.content_mut()?;
        content.name = self.name.clone();
        content.title = self.title.clone();
        content.path = path;
        content.created = Some(now);
        content.modified = Some(now);
        content.lang = service.settings().default_lang.clone();

        let root = store.insert_node(root).await?;
        tracing::info!("Created application root '{}' at {}", self.name, self.path);
        service.notify(ContentEvent::Created(root.clone()));
        Ok(root)
    }
}
