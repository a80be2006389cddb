//! Share form: grant or revoke local roles on content.

use crate::forms::{field_errors, Button, FormResponse, MessageKind};
use crate::models::{FieldError, LocalRoles, Node};
use crate::security::{AuthContext, NodeWrapper, SHAREABLE_ROLES};
use crate::services::{CmsError, ContentService};
use serde_json::{Map, Value};

pub struct ShareForm<'s> {
    content: NodeWrapper<'s>,
}

impl<'s> ShareForm<'s> {
    pub async fn new(
        service: &'s ContentService,
        auth: &AuthContext,
        content: Node,
    ) -> Result<Self, CmsError> {
        let content = service.wrap(auth, content).await?;
        content.action("share")?;
        Ok(Self { content })
    }

    pub fn roles(&self) -> &'static [&'static str] {
        SHAREABLE_ROLES
    }

    /// Current grants of the content
    pub fn local_roles(&self) -> &LocalRoles {
        &self.content.node().local_roles
    }

    /// Submitted data: `principal` (string) and `roles` (array of role ids)
    pub async fn submit(
        &self,
        button: Button,
        data: &Map<String, Value>,
    ) -> Result<FormResponse, CmsError> {
        match button {
            Button::Share => self.share(data).await,
            Button::Cancel => Ok(FormResponse::redirect(".")),
            other => Err(CmsError::invalid_arguments(other.label())),
        }
    }

    async fn share(&self, data: &Map<String, Value>) -> Result<FormResponse, CmsError> {
        let mut errors = Vec::new();

        let principal = data
            .get("principal")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default();
        if principal.is_empty() {
            errors.push(FieldError::field("principal", "Required"));
        }

        let mut roles = Vec::new();
        for role in data
            .get("roles")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            match role.as_str() {
                Some(role) if SHAREABLE_ROLES.contains(&role) => roles.push(role.to_string()),
                _ => errors.push(FieldError::field("roles", format!("Unknown role: {}", role))),
            }
        }

        if !errors.is_empty() {
            tracing::warn!("Share of {} rejected", self.content.node().uri);
            return Ok(FormResponse::invalid(errors));
        }

        match self.content.share(principal, roles).await {
            Ok(_) => Ok(FormResponse::redirect(".")
                .with_message(MessageKind::Success, "Local roles have been updated.")),
            Err(err) => Ok(FormResponse::invalid(field_errors(err)?)),
        }
    }
}
