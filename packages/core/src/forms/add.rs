//! Add form: create content of one type inside a container.

use crate::forms::{content_url, field_errors, Button, FormResponse, MessageKind};
use crate::models::{content_name_schema, FieldError, Fieldset, Node, NAME_FIELD};
use crate::registry::TypeInformation;
use crate::security::{AuthContext, NodeWrapper};
use crate::services::{CmsError, ContentService};
use crate::utils::{choose_name, normalize_name};
use serde_json::{Map, Value};
use std::sync::Arc;

pub struct AddForm<'s> {
    container: NodeWrapper<'s>,
    tinfo: Arc<TypeInformation>,
}

impl<'s> AddForm<'s> {
    /// Prepare the form
    ///
    /// # Errors
    ///
    /// - `UnknownType` for an unregistered type
    /// - `UnknownAction` if `container` is not a container
    /// - `Forbidden` / `TypeNotAllowed` if the type can't be added here
    pub async fn new(
        service: &'s ContentService,
        auth: &AuthContext,
        container: Node,
        type_name: &str,
    ) -> Result<Self, CmsError> {
        let tinfo = service.type_info(type_name)?;
        let container = service.wrap(auth, container).await?;
        container.action("create")?;
        tinfo.check_context(&container.check(), service.registry())?;
        Ok(Self { container, tinfo })
    }

    pub fn label(&self) -> String {
        format!("Add {}", self.tinfo.title)
    }

    pub fn description(&self) -> &str {
        &self.tinfo.description
    }

    /// Name field followed by the type's fieldset
    pub fn fields(&self) -> Fieldset {
        content_name_schema().merge(&self.tinfo.fieldset)
    }

    async fn keys(&self) -> Result<Vec<String>, CmsError> {
        let node = self.container.node().clone();
        self.container.service().container(node)?.keys().await
    }

    /// First free name derived from `title`, falling back to the type name
    pub async fn choose_name(&self, title: &str) -> Result<String, CmsError> {
        let source = if normalize_name(title).is_empty() {
            self.tinfo.name.as_str()
        } else {
            title
        };
        Ok(choose_name(source, &self.tinfo.name_suffix, &self.keys().await?))
    }

    /// Checks on top of field extraction
    pub async fn validate(&self, values: &Map<String, Value>) -> Result<Vec<FieldError>, CmsError> {
        let mut errors = Vec::new();
        if let Some(name) = values.get(NAME_FIELD).and_then(Value::as_str) {
            if self.keys().await?.iter().any(|key| key == name) {
                errors.push(FieldError::field(NAME_FIELD, "Name already in use"));
            }
        }
        Ok(errors)
    }

    pub async fn submit(
        &self,
        button: Button,
        data: &Map<String, Value>,
    ) -> Result<FormResponse, CmsError> {
        match button {
            Button::Add => self.add(data).await,
            Button::Cancel => Ok(FormResponse::redirect(".")),
            other => Err(CmsError::invalid_arguments(other.label())),
        }
    }

    async fn add(&self, data: &Map<String, Value>) -> Result<FormResponse, CmsError> {
        let (mut values, mut errors) = self.fields().extract(data);
        errors.extend(self.validate(&values).await?);
        if !errors.is_empty() {
            tracing::warn!("Add {} rejected: {} errors", self.tinfo.name, errors.len());
            return Ok(FormResponse::invalid(errors));
        }

        let name = match values.remove(NAME_FIELD) {
            Some(Value::String(name)) => name,
            _ => {
                let title = values.get("title").and_then(Value::as_str).unwrap_or("");
                self.choose_name(title).await?
            }
        };

        match self
            .container
            .create(&self.tinfo.name, Some(&name), values)
            .await
        {
            Ok(content) => {
                let url = content_url(self.container.lineage(), &content);
                Ok(FormResponse::redirect(url)
                    .with_message(MessageKind::Success, "New content has been created."))
            }
            Err(err) => {
                let errors = field_errors(err)?;
                tracing::warn!("Add {} rejected: {}", self.tinfo.name, errors[0].message);
                Ok(FormResponse::invalid(errors))
            }
        }
    }
}
