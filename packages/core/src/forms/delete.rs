//! Delete form: remove content. Containers must be emptied first.

use crate::forms::{field_errors, Button, FormResponse, MessageKind};
use crate::models::{FieldError, Node};
use crate::security::{AuthContext, NodeWrapper};
use crate::services::{url_for, CmsError, ContentService};
use serde_json::{Map, Value};

pub struct DeleteForm<'s> {
    content: NodeWrapper<'s>,
}

impl<'s> DeleteForm<'s> {
    pub async fn new(
        service: &'s ContentService,
        auth: &AuthContext,
        content: Node,
    ) -> Result<Self, CmsError> {
        let content = service.wrap(auth, content).await?;
        content.action("delete")?;
        Ok(Self { content })
    }

    pub fn label(&self) -> String {
        format!("Delete {}", self.content.node().title())
    }

    pub async fn validate(&self) -> Result<Vec<FieldError>, CmsError> {
        let node = self.content.node();
        if node.is_root() {
            return Ok(vec![FieldError::form("Application root can't be deleted.")]);
        }
        if node.is_container() {
            let service = self.content.service();
            let keys = service.container(node.clone())?.keys().await?;
            if !keys.is_empty() {
                return Ok(vec![FieldError::form(
                    CmsError::container_not_empty(&node.uri).to_string(),
                )]);
            }
        }
        Ok(Vec::new())
    }

    pub async fn submit(
        &self,
        button: Button,
        _data: &Map<String, Value>,
    ) -> Result<FormResponse, CmsError> {
        match button {
            Button::Delete => self.delete().await,
            Button::Cancel => Ok(FormResponse::redirect(".")),
            other => Err(CmsError::invalid_arguments(other.label())),
        }
    }

    async fn delete(&self) -> Result<FormResponse, CmsError> {
        let node = self.content.node();
        let errors = self.validate().await?;
        if !errors.is_empty() {
            tracing::warn!("Delete of {} rejected: {}", node.uri, errors[0].message);
            return Ok(FormResponse::invalid(errors));
        }

        if let Err(err) = self.content.delete().await {
            return Ok(FormResponse::invalid(field_errors(err)?));
        }

        Ok(FormResponse::redirect(self.parent_url())
            .with_message(MessageKind::Success, "Content has been removed."))
    }

    fn parent_url(&self) -> String {
        let parents = self.content.parents();
        let root = parents.iter().find(|n| n.is_root());
        match (root, parents.first()) {
            (Some(root), Some(parent)) => url_for(root, parent).unwrap_or_else(|| "../".into()),
            _ => "../".to_string(),
        }
    }
}
