//! Model management
//!
//! Listing of registered types and paginated access to the stored records of
//! each type, for administrative screens. Record access here bypasses the
//! content actions; callers must check `ModelModule::available` first.

use crate::models::{FieldError, Node, ValidationError, NAME_FIELD};
use crate::registry::TypeInformation;
use crate::security::{AuthContext, ROLE_MANAGER};
use crate::services::content_service::ContentService;
use crate::services::error::CmsError;
use crate::services::events::ContentEvent;
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Registered models, minus the ones disabled in settings
pub struct ModelModule<'s> {
    service: &'s ContentService,
}

impl<'s> ModelModule<'s> {
    pub const TITLE: &'static str = "Models";

    pub fn new(service: &'s ContentService) -> Self {
        Self { service }
    }

    /// Whether the caller may use the module and there is anything to list
    pub fn available(&self, auth: &AuthContext) -> bool {
        let allowed = auth.superuser || auth.roles.iter().any(|role| role == ROLE_MANAGER);
        allowed && !self.types().is_empty()
    }

    /// Types sorted by title
    pub fn types(&self) -> Vec<Arc<TypeInformation>> {
        let disabled = &self.service.settings().disable_models;
        let mut types: Vec<Arc<TypeInformation>> = self
            .service
            .registry()
            .types()
            .filter(|tinfo| !disabled.contains(&tinfo.uri()))
            .cloned()
            .collect();
        types.sort_by(|a, b| a.title.cmp(&b.title));
        types
    }

    /// Model by type name, `NotFound` when unknown or disabled
    pub fn model(&self, name: &str) -> Result<Model<'s>, CmsError> {
        self.types()
            .into_iter()
            .find(|tinfo| tinfo.name == name)
            .map(|tinfo| Model {
                service: self.service,
                tinfo,
            })
            .ok_or_else(|| CmsError::not_found(format!("type:{}", name)))
    }
}

/// One page of records
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelPage {
    pub total: usize,
    /// 1-based
    pub page: usize,
    pub pages: usize,
    pub prev: Option<usize>,
    pub next: Option<usize>,
    pub records: Vec<Value>,
}

/// Stored records of one type
pub struct Model<'s> {
    service: &'s ContentService,
    tinfo: Arc<TypeInformation>,
}

impl<'s> Model<'s> {
    pub fn type_info(&self) -> &Arc<TypeInformation> {
        &self.tinfo
    }

    /// Records ordered by id; page `0` is treated as page `1`
    pub async fn page(&self, page: usize) -> Result<ModelPage, CmsError> {
        let size = self.service.settings().page_size.max(1);
        let store = self.service.store();

        let total = store.count_by_type(&self.tinfo.name).await?;
        let pages = total.div_ceil(size);
        // past-the-end requests land on the last page
        let page = page.clamp(1, pages.max(1));
        let nodes = store
            .nodes_by_type(&self.tinfo.name, (page - 1) * size, size)
            .await?;

        let names = self.tinfo.fieldset.names();
        Ok(ModelPage {
            total,
            page,
            pages,
            prev: (page > 1).then(|| page - 1),
            next: (page < pages).then(|| page + 1),
            records: nodes.iter().map(|node| node.info(&names)).collect(),
        })
    }

    /// Record of this type by URI
    pub async fn record(&self, uri: &str) -> Result<Node, CmsError> {
        self.service
            .store()
            .get_node(uri)
            .await?
            .filter(|node| node.type_name == self.tinfo.name)
            .ok_or_else(|| CmsError::not_found(uri))
    }

    /// Create a detached record from submitted data
    pub async fn add_record(&self, data: &Map<String, Value>) -> Result<Node, CmsError> {
        let (values, errors) = self.tinfo.fieldset.extract(data);
        reject_errors(errors)?;

        let mut node = self.tinfo.create(&values)?;
        if let Some(content) = node.content.as_mut() {
            let now = Utc::now();
            content.created = Some(now);
            content.modified = Some(now);
            content.lang = self.service.settings().default_lang.clone();
            if let Some(name) = data.get(NAME_FIELD).and_then(Value::as_str) {
                content.name = name.to_string();
            }
        }

        let node = self.service.store().insert_node(node).await?;
        tracing::info!("Created {} record {}", self.tinfo.name, node.uri);
        self.service.notify(ContentEvent::Created(node.clone()));
        Ok(node)
    }

    /// Overwrite fieldset values of a record
    pub async fn edit_record(
        &self,
        uri: &str,
        data: &Map<String, Value>,
    ) -> Result<Node, CmsError> {
        let record = self.record(uri).await?;
        let (values, errors) = self.tinfo.fieldset.extract(data);
        reject_errors(errors)?;
        self.service.do_update(&record, &values).await
    }

    /// Delete the records with the given URIs, returning how many were removed
    ///
    /// URIs that do not name a record of this type are skipped.
    pub async fn remove(&self, uris: &[String]) -> Result<usize, CmsError> {
        let mut removed = 0;
        for uri in uris {
            match self.record(uri).await {
                Ok(record) => {
                    self.service.delete_subtree(record).await?;
                    removed += 1;
                }
                Err(err) if err.is_not_found() => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(removed)
    }
}

fn reject_errors(errors: Vec<FieldError>) -> Result<(), CmsError> {
    match errors.into_iter().next() {
        Some(error) => Err(ValidationError::InvalidFieldValue {
            field: error.field.unwrap_or_default(),
            reason: error.message,
        }
        .into()),
        None => Ok(()),
    }
}
