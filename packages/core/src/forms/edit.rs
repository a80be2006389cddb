//! Edit form: update the fieldset values of content.

use crate::forms::{field_errors, Button, FormResponse, MessageKind};
use crate::models::{content_schema, Fieldset, Node};
use crate::security::{AuthContext, NodeWrapper};
use crate::services::{CmsError, ContentService};
use serde_json::{Map, Value};

pub struct EditForm<'s> {
    content: NodeWrapper<'s>,
}

impl<'s> EditForm<'s> {
    /// Prepare the form; the caller must be allowed to `update` the content
    pub async fn new(
        service: &'s ContentService,
        auth: &AuthContext,
        content: Node,
    ) -> Result<Self, CmsError> {
        let content = service.wrap(auth, content).await?;
        content.action("update")?;
        Ok(Self { content })
    }

    pub fn label(&self) -> String {
        let title = self
            .content
            .type_info()
            .map(|tinfo| tinfo.title.as_str())
            .unwrap_or("");
        format!("Modify content: {}", title)
    }

    pub fn fields(&self) -> Fieldset {
        self.content
            .type_info()
            .map(|tinfo| tinfo.fieldset.clone())
            .unwrap_or_else(content_schema)
    }

    /// Current values of the form fields
    pub fn form_content(&self) -> Map<String, Value> {
        let node = self.content.node();
        self.fields()
            .fields()
            .iter()
            .map(|field| {
                let value = match node.field(&field.name) {
                    Value::Null => field.default.clone().unwrap_or(Value::Null),
                    value => value,
                };
                (field.name.clone(), value)
            })
            .collect()
    }

    pub async fn submit(
        &self,
        button: Button,
        data: &Map<String, Value>,
    ) -> Result<FormResponse, CmsError> {
        match button {
            Button::Save => self.save(data).await,
            Button::Cancel => Ok(FormResponse::redirect(".")),
            other => Err(CmsError::invalid_arguments(other.label())),
        }
    }

    async fn save(&self, data: &Map<String, Value>) -> Result<FormResponse, CmsError> {
        let (values, errors) = self.fields().extract(data);
        if !errors.is_empty() {
            tracing::warn!("Edit of {} rejected: {} errors", self.content.node().uri, errors.len());
            return Ok(FormResponse::invalid(errors));
        }

        match self.content.update(values).await {
            Ok(_) => Ok(FormResponse::redirect(".")
                .with_message(MessageKind::Success, "Changes have been saved.")),
            Err(err) => Ok(FormResponse::invalid(field_errors(err)?)),
        }
    }
}
