//! Rename form: change the name of content inside its container.
//!
//! Application roots and the content directly below them keep their names;
//! such submissions are answered with a notice and nothing is changed.

use crate::forms::{content_url, field_errors, Button, FormResponse, MessageKind};
use crate::models::{content_name_schema, FieldError, Field, Fieldset, Node, NAME_FIELD};
use crate::security::{AuthContext, NodeWrapper};
use crate::services::{CmsError, ContentService};
use serde_json::{json, Map, Value};

pub struct RenameForm<'s> {
    content: NodeWrapper<'s>,
}

impl<'s> RenameForm<'s> {
    pub async fn new(
        service: &'s ContentService,
        auth: &AuthContext,
        content: Node,
    ) -> Result<Self, CmsError> {
        let content = service.wrap(auth, content).await?;
        content.action("rename")?;
        Ok(Self { content })
    }

    pub fn label(&self) -> String {
        format!("Rename {}", self.content.node().title())
    }

    /// Required name field
    pub fn fields(&self) -> Fieldset {
        content_name_schema()
            .fields()
            .iter()
            .cloned()
            .map(Field::required)
            .fold(Fieldset::default(), Fieldset::with)
    }

    pub fn form_content(&self) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert(NAME_FIELD.to_string(), json!(self.content.node().name()));
        data
    }

    /// Whether the content sits at or directly below an application root
    pub fn is_protected(&self) -> bool {
        self.content.node().is_root()
            || self
                .content
                .parents()
                .first()
                .map(Node::is_root)
                .unwrap_or(false)
    }

    pub async fn submit(
        &self,
        button: Button,
        data: &Map<String, Value>,
    ) -> Result<FormResponse, CmsError> {
        match button {
            Button::Rename => self.rename(data).await,
            Button::Cancel => Ok(FormResponse::redirect(".")),
            other => Err(CmsError::invalid_arguments(other.label())),
        }
    }

    async fn rename(&self, data: &Map<String, Value>) -> Result<FormResponse, CmsError> {
        let node = self.content.node();
        if self.is_protected() {
            tracing::warn!("Rename of {} rejected: protected position", node.uri);
            return Ok(FormResponse::rerender(Vec::new()).with_message(
                MessageKind::Warning,
                "Content at the application root can't be renamed.",
            ));
        }

        let (values, errors) = self.fields().extract(data);
        if !errors.is_empty() {
            tracing::warn!("Rename of {} rejected: {} errors", node.uri, errors.len());
            return Ok(FormResponse::invalid(errors));
        }
        let name = values
            .get(NAME_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default();

        if name == node.name() {
            return Ok(FormResponse::redirect("."));
        }

        match self.content.rename(name, Map::new()).await {
            Ok(renamed) => {
                let url = content_url(self.content.lineage(), &renamed);
                Ok(FormResponse::redirect(url)
                    .with_message(MessageKind::Success, "Content has been renamed."))
            }
            Err(err) => {
                let errors: Vec<FieldError> = field_errors(err)?;
                tracing::warn!("Rename of {} rejected: {}", node.uri, errors[0].message);
                Ok(FormResponse::invalid(errors))
            }
        }
    }
}
